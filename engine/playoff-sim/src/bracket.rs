//! Playoff bracket topology and per-trial resolution.
//!
//! [`BracketSpec`] is the league bracket wire shape: a flat list of nodes
//! where a slot is either a roster id or a reference to the winner or loser
//! of another node. [`Bracket`] validates that list into an immutable DAG
//! ordered by round. Each simulation trial resolves the bracket into its
//! own outcome buffer, leaving the topology untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::SimError;
use crate::{MatchupId, RosterId};

/// Reference to the winner (`w`) or loser (`l`) of another matchup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<MatchupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<MatchupId>,
}

impl SourceRef {
    pub fn winner_of(m: MatchupId) -> Self {
        Self { w: Some(m), l: None }
    }

    pub fn loser_of(m: MatchupId) -> Self {
        Self { w: None, l: Some(m) }
    }
}

/// One bracket node as delivered by the league API
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BracketNode {
    /// Matchup id
    pub m: MatchupId,
    /// Round, starting at 1
    pub r: u32,
    #[serde(default)]
    pub t1: Option<RosterId>,
    #[serde(default)]
    pub t2: Option<RosterId>,
    #[serde(default)]
    pub t1_from: Option<SourceRef>,
    #[serde(default)]
    pub t2_from: Option<SourceRef>,
    /// Winner, when already decided
    #[serde(default)]
    pub w: Option<RosterId>,
    /// Loser, when already decided
    #[serde(default)]
    pub l: Option<RosterId>,
    /// Place decided by this matchup; 1 marks the final
    #[serde(default)]
    pub p: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BracketSpec {
    pub nodes: Vec<BracketNode>,
}

/// Where a matchup participant comes from. Indices point into
/// [`Bracket::matchups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Team(RosterId),
    WinnerOf(usize),
    LoserOf(usize),
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decided {
    pub winner: RosterId,
    pub loser: Option<RosterId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketMatchup {
    pub id: MatchupId,
    pub round: u32,
    pub slots: [Slot; 2],
    pub decided: Option<Decided>,
    pub place: Option<u32>,
}

/// Resolution of one matchup within a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub teams: [Option<RosterId>; 2],
    pub winner: Option<RosterId>,
    pub loser: Option<RosterId>,
}

/// Validated bracket topology
#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    /// Sorted by (round, id); every reference points to an earlier entry
    matchups: Vec<BracketMatchup>,
    index: HashMap<MatchupId, usize>,
    final_index: Option<usize>,
}

fn other(winner: RosterId, teams: [Option<RosterId>; 2]) -> Option<RosterId> {
    match teams {
        [Some(a), b] if a == winner => b,
        [a, Some(b)] if b == winner => a,
        _ => None,
    }
}

impl Bracket {
    pub fn from_spec(spec: BracketSpec) -> Result<Self, SimError> {
        let mut nodes = spec.nodes;
        nodes.sort_by_key(|node| (node.r, node.m));

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.m, i).is_some() {
                return Err(SimError::DuplicateMatchup(node.m));
            }
        }

        let mut matchups = Vec::with_capacity(nodes.len());
        let mut final_index = None;
        for (i, node) in nodes.iter().enumerate() {
            let slot = |team: Option<RosterId>, from: Option<SourceRef>| -> Result<Slot, SimError> {
                if let Some(team) = team {
                    return Ok(Slot::Team(team));
                }
                let Some(from) = from else {
                    return Ok(Slot::Open);
                };
                let (reference, winner) = match (from.w, from.l) {
                    (Some(m), _) => (m, true),
                    (None, Some(m)) => (m, false),
                    (None, None) => return Err(SimError::EmptyReference { matchup: node.m }),
                };
                let target = *index
                    .get(&reference)
                    .ok_or(SimError::UnknownMatchup { matchup: node.m, reference })?;
                if nodes[target].r >= node.r {
                    return Err(SimError::ForwardReference { matchup: node.m, reference });
                }
                Ok(if winner { Slot::WinnerOf(target) } else { Slot::LoserOf(target) })
            };

            if node.p == Some(1) {
                if final_index.is_some() {
                    return Err(SimError::DuplicateFinal);
                }
                final_index = Some(i);
            }

            matchups.push(BracketMatchup {
                id: node.m,
                round: node.r,
                slots: [slot(node.t1, node.t1_from)?, slot(node.t2, node.t2_from)?],
                decided: node.w.map(|winner| Decided { winner, loser: node.l }),
                place: node.p,
            });
        }

        Ok(Self { matchups, index, final_index })
    }

    pub fn matchups(&self) -> &[BracketMatchup] {
        &self.matchups
    }

    pub fn matchup(&self, id: MatchupId) -> Option<&BracketMatchup> {
        self.index.get(&id).map(|i| &self.matchups[*i])
    }

    pub fn final_matchup(&self) -> Option<&BracketMatchup> {
        self.final_index.map(|i| &self.matchups[i])
    }

    pub fn len(&self) -> usize {
        self.matchups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchups.is_empty()
    }

    pub fn rounds(&self) -> u32 {
        self.matchups.iter().map(|m| m.round).max().unwrap_or(0)
    }

    /// Rosters named anywhere in the bracket, as seeds or recorded results
    pub fn participants(&self) -> BTreeSet<RosterId> {
        let mut rosters = BTreeSet::new();
        for matchup in &self.matchups {
            for slot in matchup.slots {
                if let Slot::Team(team) = slot {
                    rosters.insert(team);
                }
            }
            if let Some(decided) = matchup.decided {
                rosters.insert(decided.winner);
                rosters.extend(decided.loser);
            }
        }
        rosters
    }

    /// Mark an already-played matchup as decided
    pub fn record_result(&mut self, id: MatchupId, winner: RosterId) -> Result<(), SimError> {
        let i = *self.index.get(&id).ok_or(SimError::NoSuchMatchup(id))?;
        let teams = self.known_outcomes()[i].teams;
        if let [Some(a), Some(b)] = teams {
            if winner != a && winner != b {
                return Err(SimError::NotAParticipant { matchup: id, roster: winner });
            }
        }
        self.matchups[i].decided = Some(Decided { winner, loser: other(winner, teams) });
        Ok(())
    }

    /// Resolve every matchup in round order. `decide` picks the winner of
    /// each undecided matchup whose participants are both known; matchups
    /// with an unresolved participant are left without a winner.
    pub fn resolve<F>(&self, decide: F) -> Vec<MatchOutcome>
    where
        F: FnMut(&BracketMatchup, RosterId, RosterId) -> RosterId,
    {
        let mut outcomes = Vec::with_capacity(self.matchups.len());
        self.resolve_into(&mut outcomes, decide);
        outcomes
    }

    /// [`resolve`](Self::resolve) into a reusable buffer
    pub fn resolve_into<F>(&self, outcomes: &mut Vec<MatchOutcome>, mut decide: F)
    where
        F: FnMut(&BracketMatchup, RosterId, RosterId) -> RosterId,
    {
        self.walk(outcomes, |matchup, a, b| Some(decide(matchup, a, b)));
    }

    /// Participants and results that follow from recorded results alone
    pub fn known_outcomes(&self) -> Vec<MatchOutcome> {
        let mut outcomes = Vec::with_capacity(self.matchups.len());
        self.walk(&mut outcomes, |_, _, _| None);
        outcomes
    }

    fn walk<F>(&self, outcomes: &mut Vec<MatchOutcome>, mut decide: F)
    where
        F: FnMut(&BracketMatchup, RosterId, RosterId) -> Option<RosterId>,
    {
        outcomes.clear();
        for matchup in &self.matchups {
            let teams = matchup.slots.map(|slot| match slot {
                Slot::Team(team) => Some(team),
                Slot::WinnerOf(i) => outcomes.get(i).and_then(|o| o.winner),
                Slot::LoserOf(i) => outcomes.get(i).and_then(|o| o.loser),
                Slot::Open => None,
            });

            let outcome = match (matchup.decided, teams) {
                (Some(decided), _) => MatchOutcome {
                    teams,
                    winner: Some(decided.winner),
                    loser: decided.loser.or_else(|| other(decided.winner, teams)),
                },
                (None, [Some(a), Some(b)]) => match decide(matchup, a, b) {
                    Some(winner) => {
                        let loser = if winner == a { b } else { a };
                        MatchOutcome { teams, winner: Some(winner), loser: Some(loser) }
                    }
                    None => MatchOutcome { teams, winner: None, loser: None },
                },
                (None, _) => MatchOutcome { teams, winner: None, loser: None },
            };
            outcomes.push(outcome);
        }
    }

    /// Winner of the final in a resolved trial
    pub fn champion(&self, outcomes: &[MatchOutcome]) -> Option<RosterId> {
        self.final_index.and_then(|i| outcomes.get(i)).and_then(|o| o.winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(m: MatchupId, r: u32) -> BracketNode {
        BracketNode { m, r, ..Default::default() }
    }

    /// Four-team bracket: two semifinals, a final and a third-place game
    fn four_team() -> BracketSpec {
        BracketSpec {
            nodes: vec![
                BracketNode { t1: Some(1), t2: Some(4), ..node(1, 1) },
                BracketNode { t1: Some(2), t2: Some(3), ..node(2, 1) },
                BracketNode {
                    t1_from: Some(SourceRef::winner_of(1)),
                    t2_from: Some(SourceRef::winner_of(2)),
                    p: Some(1),
                    ..node(3, 2)
                },
                BracketNode {
                    t1_from: Some(SourceRef::loser_of(1)),
                    t2_from: Some(SourceRef::loser_of(2)),
                    p: Some(3),
                    ..node(4, 2)
                },
            ],
        }
    }

    #[test]
    fn test_recorded_winner_feeds_next_round() {
        let spec = BracketSpec {
            nodes: vec![
                BracketNode { t1: Some(5), t2: Some(6), w: Some(5), l: Some(6), ..node(1, 1) },
                BracketNode {
                    t1_from: Some(SourceRef::winner_of(1)),
                    t2: Some(7),
                    p: Some(1),
                    ..node(2, 2)
                },
            ],
        };
        let bracket = Bracket::from_spec(spec).unwrap();

        let mut seen = Vec::new();
        let outcomes = bracket.resolve(|matchup, t1, t2| {
            seen.push((matchup.id, t1, t2));
            t2
        });
        assert_eq!(seen, vec![(2, 5, 7)]);
        assert_eq!(outcomes[1].teams, [Some(5), Some(7)]);
        assert_eq!(bracket.champion(&outcomes), Some(7));
    }

    #[test]
    fn test_full_resolution_with_losers_game() {
        let bracket = Bracket::from_spec(four_team()).unwrap();
        assert_eq!(bracket.rounds(), 2);
        assert_eq!(bracket.participants(), BTreeSet::from([1, 2, 3, 4]));

        // Lower roster id always wins
        let outcomes = bracket.resolve(|_, a, b| a.min(b));
        assert_eq!(bracket.champion(&outcomes), Some(1));
        let third_place = outcomes[3];
        assert_eq!(bracket.matchups()[3].place, Some(3));
        assert_eq!(third_place.teams, [Some(4), Some(3)]);
        assert_eq!(third_place.winner, Some(3));
    }

    #[test]
    fn test_record_result_and_resolution_reuse() {
        let mut bracket = Bracket::from_spec(four_team()).unwrap();
        bracket.record_result(1, 4).unwrap();
        assert_eq!(
            bracket.record_result(2, 9),
            Err(SimError::NotAParticipant { matchup: 2, roster: 9 })
        );
        assert_eq!(bracket.record_result(42, 1), Err(SimError::NoSuchMatchup(42)));

        let mut buffer = Vec::new();
        let mut calls = 0;
        bracket.resolve_into(&mut buffer, |_, a, _| {
            calls += 1;
            a
        });
        // Semifinal 1 is decided; semifinal 2, the final and third place are simulated
        assert_eq!(calls, 3);
        assert_eq!(buffer[0].winner, Some(4));
        assert_eq!(buffer[0].loser, Some(1));
        assert_eq!(bracket.champion(&buffer), Some(4));

        bracket.resolve_into(&mut buffer, |_, _, b| b);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_unresolved_slots_are_skipped() {
        let spec = BracketSpec {
            nodes: vec![
                BracketNode { t1: Some(1), ..node(1, 1) },
                BracketNode { t1_from: Some(SourceRef::winner_of(1)), t2: Some(2), p: Some(1), ..node(2, 2) },
            ],
        };
        let bracket = Bracket::from_spec(spec).unwrap();
        let outcomes = bracket.resolve(|_, a, _| a);
        assert_eq!(outcomes[0].winner, None);
        assert_eq!(outcomes[1].teams, [None, Some(2)]);
        assert_eq!(bracket.champion(&outcomes), None);
    }

    #[test]
    fn test_known_outcomes_follow_recorded_results() {
        let mut bracket = Bracket::from_spec(four_team()).unwrap();
        bracket.record_result(1, 1).unwrap();
        bracket.record_result(2, 3).unwrap();

        let known = bracket.known_outcomes();
        assert_eq!(known[2].teams, [Some(1), Some(3)]);
        assert_eq!(known[2].winner, None);
        assert_eq!(known[3].teams, [Some(4), Some(2)]);

        // The final's participants come from recorded semifinals
        assert_eq!(
            bracket.record_result(3, 2),
            Err(SimError::NotAParticipant { matchup: 3, roster: 2 })
        );
        bracket.record_result(3, 3).unwrap();
        assert_eq!(bracket.champion(&bracket.known_outcomes()), Some(3));
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = BracketSpec { nodes: vec![node(1, 1), node(1, 2)] };
        assert_eq!(Bracket::from_spec(duplicate), Err(SimError::DuplicateMatchup(1)));

        let unknown = BracketSpec {
            nodes: vec![BracketNode { t1_from: Some(SourceRef::winner_of(9)), ..node(1, 2) }],
        };
        assert_eq!(
            Bracket::from_spec(unknown),
            Err(SimError::UnknownMatchup { matchup: 1, reference: 9 })
        );

        let same_round = BracketSpec {
            nodes: vec![node(1, 1), BracketNode { t2_from: Some(SourceRef::loser_of(1)), ..node(2, 1) }],
        };
        assert_eq!(
            Bracket::from_spec(same_round),
            Err(SimError::ForwardReference { matchup: 2, reference: 1 })
        );

        let self_reference = BracketSpec {
            nodes: vec![BracketNode { t1_from: Some(SourceRef::winner_of(1)), ..node(1, 1) }],
        };
        assert_eq!(
            Bracket::from_spec(self_reference),
            Err(SimError::ForwardReference { matchup: 1, reference: 1 })
        );

        let empty_ref = BracketSpec {
            nodes: vec![node(1, 1), BracketNode { t1_from: Some(SourceRef::default()), ..node(2, 2) }],
        };
        assert_eq!(Bracket::from_spec(empty_ref), Err(SimError::EmptyReference { matchup: 2 }));

        let two_finals = BracketSpec {
            nodes: vec![BracketNode { p: Some(1), ..node(1, 1) }, BracketNode { p: Some(1), ..node(2, 1) }],
        };
        assert_eq!(Bracket::from_spec(two_finals), Err(SimError::DuplicateFinal));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"[
            {"r":1,"m":1,"t1":3,"t2":6,"w":null,"l":null},
            {"r":1,"m":2,"t1":4,"t2":5,"w":4,"l":5},
            {"r":2,"m":3,"t1":1,"t2_from":{"w":1},"w":null,"l":null},
            {"r":2,"m":4,"t1":2,"t2_from":{"w":2},"w":null,"l":null},
            {"r":3,"m":5,"t1_from":{"w":3},"t2_from":{"w":4},"p":1},
            {"r":3,"m":6,"t1_from":{"l":3},"t2_from":{"l":4},"p":3}
        ]"#;
        let spec: BracketSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.nodes.len(), 6);
        assert_eq!(spec.nodes[2].t2_from, Some(SourceRef::winner_of(1)));

        let bracket = Bracket::from_spec(spec).unwrap();
        assert_eq!(bracket.final_matchup().map(|m| m.id), Some(5));
        assert_eq!(bracket.matchup(4).map(|m| m.slots), Some([Slot::Team(2), Slot::WinnerOf(1)]));
    }
}
