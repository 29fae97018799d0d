use std::fmt;
use std::str::FromStr;

/// Kind of a CMS node. Decides which metadata fragment is extracted and whether
/// draft/published bodies exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Section,
    Page,
    File,
    Layout,
    Partial,
}

impl NodeType {
    /// True for the types that carry draft and published bodies.
    pub fn is_content_bearing(self) -> bool {
        match self {
            NodeType::Page | NodeType::Layout | NodeType::Partial => true,
            NodeType::Section | NodeType::File => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Section => "Section",
            NodeType::Page => "Page",
            NodeType::File => "File",
            NodeType::Layout => "Layout",
            NodeType::Partial => "Partial",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type label in a section listing that is none of the known node types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized node type label {0:?}")]
pub struct UnknownNodeType(pub String);

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    /// Parses the type column of a section listing. Surrounding whitespace and
    /// letter case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "section" => Ok(NodeType::Section),
            "page" => Ok(NodeType::Page),
            "file" => Ok(NodeType::File),
            "layout" => Ok(NodeType::Layout),
            "partial" => Ok(NodeType::Partial),
            _ => Err(UnknownNodeType(s.trim().to_string())),
        }
    }
}
