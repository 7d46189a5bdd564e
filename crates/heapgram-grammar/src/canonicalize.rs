//! Canonicalization: fold embedded right-hand sides back into nonterminal
//! edges until no rule applies.

use heapgram_core::{HeapConfiguration, Matching, Nonterminal};
use heapgram_match::{find_matching, MatchingKind};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::GrammarError;
use crate::grammar::Grammar;

/// How close to program variables folding may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbstractionMode {
    /// Use the configured abstraction distance.
    #[default]
    Lenient,
    /// Fold wherever a rule embeds, regardless of variables.
    Aggressive,
}

/// Statistics about the folds applied by one canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalizationStats {
    /// Folds with ordinary right-hand sides.
    pub folds: usize,
    /// Folds with collapsed right-hand sides.
    pub collapsed_folds: usize,
    pub initial_size: usize,
    pub final_size: usize,
}

impl CanonicalizationStats {
    pub fn total_folds(&self) -> usize {
        self.folds + self.collapsed_folds
    }
}

/// Canonicalization against a grammar with a fixed abstraction distance.
///
/// Distance 0 folds any embedding. Distance 1 keeps dereferenced pattern
/// nodes off nodes named by variables. Larger distances keep them at least
/// that many selector hops away.
#[derive(Debug, Clone)]
pub struct CanonicalizationStrategy<'g> {
    grammar: &'g Grammar,
    distance: usize,
    protect_constants: bool,
}

struct Fold<'g> {
    lhs: &'g Nonterminal,
    matching: Matching<'g>,
    external_map: Option<&'g [usize]>,
}

impl<'g> CanonicalizationStrategy<'g> {
    pub fn new(grammar: &'g Grammar, distance: usize) -> Self {
        Self {
            grammar,
            distance,
            protect_constants: false,
        }
    }

    /// Treat constants like variables when keeping distance.
    pub fn protect_constants(mut self, protect: bool) -> Self {
        self.protect_constants = protect;
        self
    }

    pub fn distance(&self) -> usize {
        self.distance
    }

    /// The matching variant used to find foldable structure.
    pub fn matching_kind(&self, mode: AbstractionMode) -> MatchingKind {
        let distance = match mode {
            AbstractionMode::Lenient => self.distance,
            AbstractionMode::Aggressive => 0,
        };
        match distance {
            0 => MatchingKind::Embedding,
            1 => MatchingKind::MinDistanceEmbedding {
                protect_constants: self.protect_constants,
            },
            depth => MatchingKind::MinDepthEmbedding {
                depth,
                protect_constants: self.protect_constants,
            },
        }
    }

    /// Fold until no rule embeds.
    ///
    /// Rules are tried in grammar order, ordinary right-hand sides before
    /// collapsed ones; the first embedding found is folded.
    pub fn canonicalize(
        &self,
        mut heap: HeapConfiguration,
        mode: AbstractionMode,
    ) -> Result<(HeapConfiguration, CanonicalizationStats), GrammarError> {
        let kind = self.matching_kind(mode);
        let mut stats = CanonicalizationStats {
            initial_size: heap.size(),
            ..Default::default()
        };

        while let Some(fold) = self.first_fold(&heap, kind) {
            let mut builder = heap.builder();
            match fold.external_map {
                None => {
                    builder.replace_matching(&fold.matching, fold.lhs.clone())?;
                    stats.folds += 1;
                }
                Some(map) => {
                    builder.replace_matching_collapsed(&fold.matching, fold.lhs.clone(), map)?;
                    stats.collapsed_folds += 1;
                }
            }
            heap = builder.build();
            debug!("folded {} ({} elements left)", fold.lhs, heap.size());
        }

        stats.final_size = heap.size();
        Ok((heap, stats))
    }

    fn first_fold(&self, heap: &HeapConfiguration, kind: MatchingKind) -> Option<Fold<'g>> {
        for (lhs, rhs) in self.grammar.rules() {
            if let Some(matching) = find_matching(rhs, heap, kind) {
                return Some(Fold {
                    lhs,
                    matching,
                    external_map: None,
                });
            }
        }
        for (lhs, rule) in self.grammar.collapsed_rules() {
            if let Some(matching) = find_matching(&rule.heap, heap, kind) {
                return Some(Fold {
                    lhs,
                    matching,
                    external_map: Some(&rule.external_map),
                });
            }
        }
        None
    }
}
