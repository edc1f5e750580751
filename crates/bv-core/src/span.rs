use std::path::PathBuf;

pub type FileId = u64;

/// Source position of a statement or expression. `line` is 0 when the front
/// end had no line information.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
    #[serde(default)]
    pub line: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(f, "Span({}:{}-{} line {})", self.file, self.lo, self.hi, self.line)
        } else {
            write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
        }
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span {
            file,
            lo,
            hi,
            line: 0,
        }
    }

    pub fn with_line(mut self, line: u32) -> Span {
        self.line = line;
        self
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FileInfo {
    pub file: PathBuf,
}
