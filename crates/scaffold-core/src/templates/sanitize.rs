//! Byte-order-mark removal for known text configuration files

use std::path::Path;
use tokio::fs;
use tracing::debug;

/// UTF-8 encoded byte-order mark
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Files whose tooling chokes on a leading byte-order mark
pub const BOM_CHECKED_FILES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "jsconfig.json",
    ".eslintrc.json",
    ".prettierrc",
    ".gitignore",
    ".npmrc",
    "README.md",
];

/// What happened to one allowlisted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    Stripped,
    Unchanged,
    Missing,
    Failed(String),
}

/// Per-file outcomes of one sanitizer pass
#[derive(Debug, Clone, Default)]
pub struct SanitizeReport {
    pub outcomes: Vec<(String, SanitizeOutcome)>,
}

impl SanitizeReport {
    pub fn stripped(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == SanitizeOutcome::Stripped)
            .map(|(name, _)| name.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            SanitizeOutcome::Failed(reason) => Some((name.as_str(), reason.as_str())),
            _ => None,
        })
    }
}

/// Strip a leading byte-order mark from each allowlisted file in `dir`.
/// Safe to run repeatedly.
pub async fn strip_byte_order_marks(dir: &Path) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    for name in BOM_CHECKED_FILES {
        let outcome = sanitize_file(&dir.join(name)).await;
        if outcome == SanitizeOutcome::Stripped {
            debug!(file = name, "stripped byte-order mark");
        }
        report.outcomes.push((name.to_string(), outcome));
    }
    report
}

async fn sanitize_file(path: &Path) -> SanitizeOutcome {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SanitizeOutcome::Missing,
        Err(e) => return SanitizeOutcome::Failed(e.to_string()),
    };

    let Some(mut rest) = bytes.strip_prefix(&UTF8_BOM) else {
        return SanitizeOutcome::Unchanged;
    };
    // Repeated marks go too, so a second pass never finds another one.
    while let Some(next) = rest.strip_prefix(&UTF8_BOM) {
        rest = next;
    }

    match fs::write(path, rest).await {
        Ok(()) => SanitizeOutcome::Stripped,
        Err(e) => SanitizeOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bom(content: &str) -> Vec<u8> {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(content.as_bytes());
        bytes
    }

    #[tokio::test]
    async fn test_strips_bom_from_allowlisted_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), with_bom("{\"name\":\"x\"}")).unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();

        let report = strip_byte_order_marks(dir.path()).await;

        assert_eq!(
            std::fs::read(dir.path().join("package.json")).unwrap(),
            b"{\"name\":\"x\"}"
        );
        assert_eq!(report.stripped().collect::<Vec<_>>(), vec!["package.json"]);
        assert!(report
            .outcomes
            .contains(&("tsconfig.json".to_string(), SanitizeOutcome::Unchanged)));
        assert!(report
            .outcomes
            .contains(&(".npmrc".to_string(), SanitizeOutcome::Missing)));
        assert_eq!(report.failures().count(), 0);
    }

    #[tokio::test]
    async fn test_files_outside_allowlist_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = with_bom("const a = 1;");
        std::fs::write(dir.path().join("index.js"), &original).unwrap();

        strip_byte_order_marks(dir.path()).await;

        assert_eq!(std::fs::read(dir.path().join("index.js")).unwrap(), original);
    }

    #[tokio::test]
    async fn test_bytes_after_bom_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"# Caf\xe9 \xff\xfe\n");
        std::fs::write(dir.path().join("README.md"), &bytes).unwrap();

        let report = strip_byte_order_marks(dir.path()).await;

        assert_eq!(
            std::fs::read(dir.path().join("README.md")).unwrap(),
            b"# Caf\xe9 \xff\xfe\n"
        );
        assert_eq!(report.stripped().collect::<Vec<_>>(), vec!["README.md"]);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut doubled = UTF8_BOM.to_vec();
        doubled.extend(with_bom("# Title"));
        std::fs::write(dir.path().join("README.md"), &doubled).unwrap();
        std::fs::write(dir.path().join(".gitignore"), with_bom("node_modules\n")).unwrap();
        std::fs::write(dir.path().join(".npmrc"), "save-exact=true\n").unwrap();

        strip_byte_order_marks(dir.path()).await;
        let first: Vec<Vec<u8>> = ["README.md", ".gitignore", ".npmrc"]
            .iter()
            .map(|name| std::fs::read(dir.path().join(name)).unwrap())
            .collect();

        let second_report = strip_byte_order_marks(dir.path()).await;
        let second: Vec<Vec<u8>> = ["README.md", ".gitignore", ".npmrc"]
            .iter()
            .map(|name| std::fs::read(dir.path().join(name)).unwrap())
            .collect();

        assert_eq!(first, second);
        assert_eq!(first[0], b"# Title");
        assert_eq!(first[1], b"node_modules\n");
        assert_eq!(first[2], b"save-exact=true\n");
        assert_eq!(second_report.stripped().count(), 0);
    }
}
