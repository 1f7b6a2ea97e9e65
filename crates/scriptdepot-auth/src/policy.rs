//! Per-operation access policy.

/// What a request must prove before an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No verification.
    Open,
    /// Valid signature required; the timestamp may be omitted, in which case
    /// freshness is not checked. Reserved for read-only operations.
    Signed,
    /// Valid signature and an in-window timestamp required.
    SignedFresh,
}

impl Access {
    /// Read-only policy: `Signed` when reads must be signed, else `Open`.
    pub const fn for_reads(sign_reads: bool) -> Self {
        if sign_reads { Self::Signed } else { Self::Open }
    }

    /// Policy for anything that writes.
    pub const fn for_writes() -> Self {
        Self::SignedFresh
    }

    pub const fn requires_signature(self) -> bool {
        !matches!(self, Self::Open)
    }

    pub const fn requires_timestamp(self) -> bool {
        matches!(self, Self::SignedFresh)
    }
}
