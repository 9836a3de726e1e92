//! Table layout of the store. Primary tables map an encoded key to one
//! encoded record; multimap tables hold the sorted child sets that back the
//! one-to-many walks.

use redb::{MultimapTableDefinition, TableDefinition};

/// Category id to category record.
pub const CATEGORIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("categories");

/// Domain id to domain record.
pub const DOMAINS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("domains");

/// Keyword id to keyword record.
pub const KEYWORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("keywords");

/// Ranking key (keyword, engine, timestamp) to rank observation.
pub const RANKINGS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("rankings");

/// Category id to the ids of its member domains.
pub const CATEGORY_DOMAINS: MultimapTableDefinition<&[u8], &[u8]> =
    MultimapTableDefinition::new("category_domains");

/// Domain id to the ids of its keywords.
pub const DOMAIN_KEYWORDS: MultimapTableDefinition<&[u8], &[u8]> =
    MultimapTableDefinition::new("domain_keywords");

/// Keyword/engine pair to the timestamps of its observations, oldest first.
pub const KEYWORD_RANKINGS: MultimapTableDefinition<&[u8], &[u8]> =
    MultimapTableDefinition::new("keyword_rankings");
