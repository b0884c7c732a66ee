//! Leaf identifier decoding.
//!
//! Every leaf label is decoded once into a [`LeafId`]; the rest of the crate
//! dispatches on the variant instead of re-inspecting the raw string.

/// Separator marking a paralog copy (`Org..p2_311`).
pub const PARALOG_SEPARATOR: &str = "..";

/// Field count of a ranked candidate label (`Org_seq_x_{1}_y`).
pub const CANDIDATE_FIELDS: usize = 5;

/// Decoded leaf identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LeafId {
    /// One of several duplicate copies for an organism, carrying a quality rank.
    RankedCandidate {
        organism: String,
        /// `None` when the rank field does not hold an integer.
        rank: Option<u32>,
        quality: String,
    },
    /// Paralog copy, `<org>..<marker>_<length>`.
    Paralog {
        organism: String,
        marker: String,
        length: String,
    },
    /// Plain organism leaf, `<org>_<length>`.
    Simple { organism: String, length: String },
}

impl LeafId {
    /// Decode a leaf label. Total: any string maps to exactly one variant.
    pub fn parse(label: &str) -> Self {
        if let Some((organism, rest)) = label.split_once(PARALOG_SEPARATOR) {
            let (marker, length) = rest.split_once('_').unwrap_or((rest, ""));
            return LeafId::Paralog {
                organism: organism.to_string(),
                marker: marker.to_string(),
                length: length.to_string(),
            };
        }

        let fields: Vec<&str> = label.split('_').collect();
        if fields.len() == CANDIDATE_FIELDS {
            return LeafId::RankedCandidate {
                organism: fields[0].to_string(),
                rank: parse_rank(fields[3]),
                quality: fields[2..].join("_"),
            };
        }

        let (organism, length) = label.split_once('_').unwrap_or((label, ""));
        LeafId::Simple {
            organism: organism.to_string(),
            length: length.to_string(),
        }
    }

    pub fn organism(&self) -> &str {
        match self {
            LeafId::RankedCandidate { organism, .. }
            | LeafId::Paralog { organism, .. }
            | LeafId::Simple { organism, .. } => organism,
        }
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self, LeafId::RankedCandidate { .. })
    }

    /// Quality tag for candidates, length tag otherwise.
    pub fn tag(&self) -> &str {
        match self {
            LeafId::RankedCandidate { quality, .. } => quality,
            LeafId::Paralog { length, .. } | LeafId::Simple { length, .. } => length,
        }
    }

    /// Identifier shown after `@` in display names.
    pub fn display_code(&self) -> String {
        match self {
            LeafId::Paralog {
                organism, marker, ..
            } => format!("{organism}{PARALOG_SEPARATOR}{marker}"),
            other => other.organism().to_string(),
        }
    }
}

/// Rank is written wrapped in one character on each side, e.g. `{3}`.
fn parse_rank(field: &str) -> Option<u32> {
    let mut chars = field.chars();
    chars.next()?;
    chars.next_back()?;
    chars.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_candidate() {
        let leaf = LeafId::parse("Homosap_c123_len_{2}_q9");
        assert_eq!(
            leaf,
            LeafId::RankedCandidate {
                organism: "Homosap".to_string(),
                rank: Some(2),
                quality: "len_{2}_q9".to_string(),
            }
        );
        assert!(leaf.is_candidate());
    }

    #[test]
    fn unparsable_rank_is_none() {
        match LeafId::parse("X_hit_0_0_0") {
            LeafId::RankedCandidate { organism, rank, .. } => {
                assert_eq!(organism, "X");
                assert_eq!(rank, None);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn paralog_wins_over_field_count() {
        let leaf = LeafId::parse("Musmus..p2_a_b_c_d");
        assert!(matches!(leaf, LeafId::Paralog { .. }));
        assert_eq!(leaf.organism(), "Musmus");
        assert_eq!(leaf.display_code(), "Musmus..p2");
        assert_eq!(leaf.tag(), "a_b_c_d");
    }

    #[test]
    fn simple_leaf() {
        let leaf = LeafId::parse("Danrer_412");
        assert_eq!(
            leaf,
            LeafId::Simple {
                organism: "Danrer".to_string(),
                length: "412".to_string(),
            }
        );
        assert_eq!(leaf.display_code(), "Danrer");
    }

    #[test]
    fn label_without_underscore_is_simple() {
        let leaf = LeafId::parse("Danrer");
        assert_eq!(leaf.organism(), "Danrer");
        assert_eq!(leaf.tag(), "");
    }
}
