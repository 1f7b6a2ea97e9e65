//! Static checks for Lua/Luau script content.

use serde::{Deserialize, Serialize};

use crate::model::ScriptKind;

const MAX_PRINT_CALLS: usize = 10;

const RISKY_APIS: [&str; 4] = [
    "loadstring",
    "getrawmetatable",
    "setrawmetatable",
    "debug.sethook",
];

/// Linter findings for one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub script_type: ScriptKind,
    pub content_length: usize,
}

/// Lint `content`. Only empty content makes a script invalid.
pub fn lint(content: &str, kind: ScriptKind) -> ValidationReport {
    let mut report = ValidationReport {
        valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        suggestions: Vec::new(),
        script_type: kind,
        content_length: content.chars().count(),
    };

    if content.trim().is_empty() {
        report.valid = false;
        report.errors.push("Script content is empty".to_string());
        return report;
    }

    if content.contains("function") && !content.contains("end") {
        report
            .warnings
            .push("Possible missing 'end' keywords for functions".to_string());
    }
    if content.matches("print(").count() > MAX_PRINT_CALLS {
        report
            .warnings
            .push("Multiple print statements detected - consider using logging".to_string());
    }
    if content.contains("while true do") {
        report
            .warnings
            .push("Infinite loop detected - ensure proper exit condition".to_string());
    }

    for api in RISKY_APIS {
        if content.contains(api) {
            report
                .warnings
                .push(format!("Potential security concern: '{api}' detected"));
        }
    }

    report
}
