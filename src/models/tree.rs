use super::domain::Domain;
use super::entity::EntityId;
use super::keyword::Keyword;

/// Payload attached to a row of the domain/keyword navigation tree. A row is
/// either a domain or one of its keywords; callers dispatch on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Domain(Domain),
    Keyword(Keyword),
}

impl TreeEntry {
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Domain(domain) => domain.id(),
            Self::Keyword(keyword) => keyword.id(),
        }
    }

    /// Text shown for the row: the domain name or the keyword phrase.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Domain(domain) => domain.name(),
            Self::Keyword(keyword) => keyword.value(),
        }
    }

    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}
