use lazy_static::lazy_static;
use regex::Regex;

use flow_rpc_client::codec::Address;

lazy_static! {
    // `import A from "./a.cdc"` and `import A, B from "./ab.cdc"`.
    // Address-based imports (`from 0x...`) are already resolved and are
    // not reported.
    static ref IMPORT_RE: Regex = Regex::new(
        r#"(?m)^\s*import\s+\w+(?:\s*,\s*\w+)*\s+from\s+"([^"]+)""#
    )
    .unwrap();
    static ref CONTRACT_NAME_RE: Regex = Regex::new(
        r"(?m)^\s*(?:pub|access\(all\))\s+contract\s+(?:interface\s+)?([A-Za-z_][A-Za-z0-9_]*)"
    )
    .unwrap();
}

/// One contract's source together with its location. Import handling is
/// syntactic: paths are recognized and substituted as text, the contract
/// language is never interpreted beyond that.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    location: String,
    source: String,
}

impl Program {
    pub fn new(location: &str, source: &str) -> Program {
        Program {
            location: location.to_string(),
            source: source.to_string(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Import paths declared in the source, in order of appearance.
    pub fn imports(&self) -> Vec<String> {
        IMPORT_RE
            .captures_iter(&self.source)
            .map(|captures| captures[1].to_string())
            .collect()
    }

    pub fn has_imports(&self) -> bool {
        IMPORT_RE.is_match(&self.source)
    }

    /// The contract name declared in the source.
    pub fn name(&self) -> Result<String, String> {
        CONTRACT_NAME_RE
            .captures(&self.source)
            .map(|captures| captures[1].to_string())
            .ok_or(format!(
                "unable to find contract name declaration in {}",
                self.location
            ))
    }

    /// Rewrites the quoted import path into the resolved address.
    pub fn replace_import(&mut self, from: &str, to: &Address) {
        self.source = self
            .source
            .replacen(&format!("\"{}\"", from), &to.to_string(), 1);
    }
}
