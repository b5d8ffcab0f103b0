//! A fixed six-node causal network for the smoking example.
//!
//! ```text
//! income ──► healthcare ──┐
//! genetics ───────────────┼──► disease
//! smoking ────────────────┤
//!    └─────► lighter      │
//! ```
//!
//! `lighter` shares a cause with `disease` but has no path to it, so
//! observing a lighter raises P(disease) while forcing one does not. Every
//! query is exact: the five binary variables other than `disease` are
//! enumerated as the 32 bitmasks `0..32` and weighted by their joint
//! probability.
//!
//! # Interventions
//!
//! `do(X = x)` severs the in-edges of `X`: its own factor is replaced by 1
//! for assignments with `X = x` (0 otherwise) while every downstream table
//! reads the forced value. Plain conditioning keeps the in-edges and only
//! restricts the enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{check_probability, Result, SimError};

/// P(healthcare = 1 | income = 1).
pub const P_HEALTHCARE_GIVEN_INCOME: f64 = 0.80;
/// P(healthcare = 1 | income = 0).
pub const P_HEALTHCARE_GIVEN_NO_INCOME: f64 = 0.30;
/// P(lighter = 1 | smoking = 1).
pub const P_LIGHTER_GIVEN_SMOKING: f64 = 0.90;
/// P(lighter = 1 | smoking = 0).
pub const P_LIGHTER_GIVEN_NO_SMOKING: f64 = 0.05;

const BASE_RISK: f64 = 0.05;
const GENETIC_RISK: f64 = 0.25;
const SMOKING_RISK: f64 = 0.35;
const HEALTHCARE_FACTOR: f64 = 0.40;
const MAX_RISK: f64 = 0.95;

const ASSIGNMENTS: u8 = 32;

/// A variable of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Income,
    Genetics,
    Smoking,
    Healthcare,
    Lighter,
    Disease,
}

impl Node {
    /// The five enumerated variables, in bit order.
    pub const ENUMERATED: [Node; 5] = [
        Node::Income,
        Node::Genetics,
        Node::Smoking,
        Node::Healthcare,
        Node::Lighter,
    ];

    fn bit(self) -> Option<u8> {
        match self {
            Node::Income => Some(0),
            Node::Genetics => Some(1),
            Node::Smoking => Some(2),
            Node::Healthcare => Some(3),
            Node::Lighter => Some(4),
            Node::Disease => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Node::Income => "income",
            Node::Genetics => "genetics",
            Node::Smoking => "smoking",
            Node::Healthcare => "healthcare",
            Node::Lighter => "lighter",
            Node::Disease => "disease",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The directed edges of the network as `(parent, child)`.
pub const EDGES: [(Node, Node); 5] = [
    (Node::Income, Node::Healthcare),
    (Node::Genetics, Node::Disease),
    (Node::Smoking, Node::Disease),
    (Node::Smoking, Node::Lighter),
    (Node::Healthcare, Node::Disease),
];

/// Base rates of the exogenous variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    pub p_income: f64,
    pub p_genetics: f64,
    pub p_smoking: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            p_income: 0.30,
            p_genetics: 0.15,
            p_smoking: 0.25,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<()> {
        check_probability("p_income", self.p_income)?;
        check_probability("p_genetics", self.p_genetics)?;
        check_probability("p_smoking", self.p_smoking)?;
        Ok(())
    }
}

/// Disease risk from its three parents: base 5%, +25% with genetic risk,
/// +35% for smokers, then ×0.40 with good healthcare, capped at 95%.
///
/// # Examples
/// ```
/// use u_probsim::causal::disease_probability;
/// assert!((disease_probability(false, true, false) - 0.40).abs() < 1e-12);
/// assert!((disease_probability(false, true, true) - 0.16).abs() < 1e-12);
/// ```
pub fn disease_probability(genetics: bool, smoking: bool, healthcare: bool) -> f64 {
    let mut risk = BASE_RISK;
    if genetics {
        risk += GENETIC_RISK;
    }
    if smoking {
        risk += SMOKING_RISK;
    }
    if healthcare {
        risk *= HEALTHCARE_FACTOR;
    }
    risk.min(MAX_RISK)
}

/// Marginal probabilities of the derived variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeMarginals {
    pub healthcare: f64,
    pub lighter: f64,
    pub disease: f64,
}

/// Strength of one edge for display: the absolute change in the child's
/// probability between parent = 1 and parent = 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeStrength {
    pub parent: Node,
    pub child: Node,
    pub strength: f64,
}

/// Observational and interventional disease risk for one variable set to
/// each of its two values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectComparison {
    pub node: Node,
    pub observed_given_1: f64,
    pub observed_given_0: f64,
    pub do_1: f64,
    pub do_0: f64,
}

impl EffectComparison {
    /// `P(d | X=1) − P(d | X=0)`.
    pub fn observational_difference(&self) -> f64 {
        self.observed_given_1 - self.observed_given_0
    }

    /// `P(d | do(X=1)) − P(d | do(X=0))`.
    pub fn causal_effect(&self) -> f64 {
        self.do_1 - self.do_0
    }
}

#[derive(Clone, Copy)]
struct Assignment(u8);

impl Assignment {
    fn get(self, bit: u8) -> bool {
        self.0 & (1 << bit) != 0
    }

    fn income(self) -> bool {
        self.get(0)
    }
    fn genetics(self) -> bool {
        self.get(1)
    }
    fn smoking(self) -> bool {
        self.get(2)
    }
    fn healthcare(self) -> bool {
        self.get(3)
    }
    fn lighter(self) -> bool {
        self.get(4)
    }

    fn disease_probability(self) -> f64 {
        disease_probability(self.genetics(), self.smoking(), self.healthcare())
    }
}

fn bernoulli_factor(p: f64, value: bool) -> f64 {
    if value {
        p
    } else {
        1.0 - p
    }
}

fn check_value(value: u8) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SimError::InvalidParameters(format!(
            "network variables are binary, got value {other}"
        ))),
    }
}

fn enumerated_bit(node: Node) -> Result<u8> {
    node.bit().ok_or_else(|| {
        SimError::InvalidParameters(format!("{node} cannot be observed or intervened on"))
    })
}

/// The smoking network with configurable base rates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CausalNetwork {
    params: NetworkParams,
}

impl CausalNetwork {
    /// # Errors
    /// `InvalidProbability` if a base rate is outside `[0, 1]`.
    pub fn new(params: NetworkParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> NetworkParams {
        self.params
    }

    /// Joint probability of an assignment. With `severed = Some(bit)`, the
    /// factor of that variable is 1 (the caller only enumerates assignments
    /// carrying the forced value).
    fn joint(&self, a: Assignment, severed: Option<u8>) -> f64 {
        let p = &self.params;
        let factor = |bit: u8, f: f64| if severed == Some(bit) { 1.0 } else { f };

        let p_healthcare = if a.income() {
            P_HEALTHCARE_GIVEN_INCOME
        } else {
            P_HEALTHCARE_GIVEN_NO_INCOME
        };
        let p_lighter = if a.smoking() {
            P_LIGHTER_GIVEN_SMOKING
        } else {
            P_LIGHTER_GIVEN_NO_SMOKING
        };

        factor(0, bernoulli_factor(p.p_income, a.income()))
            * factor(1, bernoulli_factor(p.p_genetics, a.genetics()))
            * factor(2, bernoulli_factor(p.p_smoking, a.smoking()))
            * factor(3, bernoulli_factor(p_healthcare, a.healthcare()))
            * factor(4, bernoulli_factor(p_lighter, a.lighter()))
    }

    fn assignments() -> impl Iterator<Item = Assignment> {
        (0..ASSIGNMENTS).map(Assignment)
    }

    /// Marginal P(healthcare), P(lighter) and P(disease).
    pub fn marginals(&self) -> NodeMarginals {
        let mut m = NodeMarginals {
            healthcare: 0.0,
            lighter: 0.0,
            disease: 0.0,
        };
        for a in Self::assignments() {
            let w = self.joint(a, None);
            if a.healthcare() {
                m.healthcare += w;
            }
            if a.lighter() {
                m.lighter += w;
            }
            m.disease += w * a.disease_probability();
        }
        m
    }

    /// Weighted average of the disease risk over assignments with
    /// `node = value`. Returns 0 if those assignments carry no mass.
    fn restricted_disease(&self, bit: u8, value: bool, severed: Option<u8>) -> f64 {
        let (mut total, mut disease) = (0.0, 0.0);
        for a in Self::assignments().filter(|a| a.get(bit) == value) {
            let w = self.joint(a, severed);
            total += w;
            disease += w * a.disease_probability();
        }
        if total > 0.0 {
            disease / total
        } else {
            0.0
        }
    }

    /// Observational P(disease | node = value).
    ///
    /// # Errors
    /// `InvalidParameters` for `Node::Disease` or a value other than 0/1.
    pub fn conditional(&self, node: Node, value: u8) -> Result<f64> {
        let bit = enumerated_bit(node)?;
        Ok(self.restricted_disease(bit, check_value(value)?, None))
    }

    /// Interventional P(disease | do(node = value)).
    ///
    /// # Errors
    /// `InvalidParameters` for `Node::Disease` or a value other than 0/1.
    ///
    /// # Examples
    /// ```
    /// use u_probsim::causal::{CausalNetwork, Node};
    /// let net = CausalNetwork::default();
    /// let seen = net.conditional(Node::Lighter, 1).unwrap() - net.conditional(Node::Lighter, 0).unwrap();
    /// let forced = net.intervention(Node::Lighter, 1).unwrap() - net.intervention(Node::Lighter, 0).unwrap();
    /// assert!(seen > 0.1);
    /// assert!(forced.abs() < 1e-12);
    /// ```
    pub fn intervention(&self, node: Node, value: u8) -> Result<f64> {
        let bit = enumerated_bit(node)?;
        Ok(self.restricted_disease(bit, check_value(value)?, Some(bit)))
    }

    /// Both query modes for `node` at 1 and 0.
    pub fn compare(&self, node: Node) -> Result<EffectComparison> {
        Ok(EffectComparison {
            node,
            observed_given_1: self.conditional(node, 1)?,
            observed_given_0: self.conditional(node, 0)?,
            do_1: self.intervention(node, 1)?,
            do_0: self.intervention(node, 0)?,
        })
    }

    /// Display strength of `parent → child`.
    ///
    /// The two edges between enumerated variables use their table
    /// difference; edges into `disease` use the observational difference
    /// `|P(d | parent=1) − P(d | parent=0)|`.
    ///
    /// # Errors
    /// `InvalidParameters` if the pair is not an edge of the network.
    pub fn edge_strength(&self, parent: Node, child: Node) -> Result<f64> {
        match (parent, child) {
            (Node::Income, Node::Healthcare) => {
                Ok((P_HEALTHCARE_GIVEN_INCOME - P_HEALTHCARE_GIVEN_NO_INCOME).abs())
            }
            (Node::Smoking, Node::Lighter) => {
                Ok((P_LIGHTER_GIVEN_SMOKING - P_LIGHTER_GIVEN_NO_SMOKING).abs())
            }
            (Node::Genetics | Node::Smoking | Node::Healthcare, Node::Disease) => {
                Ok((self.conditional(parent, 1)? - self.conditional(parent, 0)?).abs())
            }
            _ => Err(SimError::InvalidParameters(format!(
                "{parent} → {child} is not an edge"
            ))),
        }
    }

    /// Strengths of all five edges, in [`EDGES`] order.
    pub fn edge_strengths(&self) -> Result<Vec<EdgeStrength>> {
        EDGES
            .iter()
            .map(|&(parent, child)| {
                Ok(EdgeStrength {
                    parent,
                    child,
                    strength: self.edge_strength(parent, child)?,
                })
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> CausalNetwork {
        CausalNetwork::default()
    }

    #[test]
    fn test_disease_table() {
        assert!((disease_probability(false, false, false) - 0.05).abs() < 1e-12);
        assert!((disease_probability(true, false, false) - 0.30).abs() < 1e-12);
        assert!((disease_probability(true, true, false) - 0.65).abs() < 1e-12);
        assert!((disease_probability(true, true, true) - 0.26).abs() < 1e-12);
        assert!((disease_probability(false, false, true) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_joint_sums_to_one() {
        let n = net();
        let total: f64 = CausalNetwork::assignments().map(|a| n.joint(a, None)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_marginals() {
        let m = net().marginals();
        // 0.3·0.8 + 0.7·0.3
        assert!((m.healthcare - 0.45).abs() < 1e-12);
        // 0.25·0.9 + 0.75·0.05
        assert!((m.lighter - 0.2625).abs() < 1e-12);
        assert!(m.disease > 0.0 && m.disease < 1.0);
    }

    #[test]
    fn test_disease_marginal_closed_form() {
        let p = NetworkParams::default();
        let h = 0.45;
        let mut expected = 0.0;
        for g in [false, true] {
            for s in [false, true] {
                for c in [false, true] {
                    let w = bernoulli_factor(p.p_genetics, g)
                        * bernoulli_factor(p.p_smoking, s)
                        * bernoulli_factor(h, c);
                    expected += w * disease_probability(g, s, c);
                }
            }
        }
        assert!((net().marginals().disease - expected).abs() < 1e-12);
    }

    #[test]
    fn test_lighter_is_confounded() {
        let cmp = net().compare(Node::Lighter).unwrap();
        assert!(
            cmp.observed_given_1 > 2.0 * cmp.observed_given_0,
            "observing a lighter should look strongly associated: {cmp:?}"
        );
        assert!(cmp.causal_effect().abs() < 0.01);
        let baseline = net().marginals().disease;
        assert!((cmp.do_1 - baseline).abs() < 1e-12);
    }

    #[test]
    fn test_smoking_has_causal_effect() {
        let cmp = net().compare(Node::Smoking).unwrap();
        assert!(cmp.causal_effect() > 0.2);
        // Smoking has no parents, so seeing and doing coincide
        assert!((cmp.do_1 - cmp.observed_given_1).abs() < 1e-12);
        assert!((cmp.do_0 - cmp.observed_given_0).abs() < 1e-12);
    }

    #[test]
    fn test_healthcare_has_no_backdoor() {
        let n = CausalNetwork::new(NetworkParams {
            p_income: 0.5,
            ..NetworkParams::default()
        })
        .unwrap();
        let cmp = n.compare(Node::Healthcare).unwrap();
        assert!(cmp.causal_effect() < 0.0);
        // income affects disease only through healthcare, so both agree here
        assert!((cmp.observational_difference() - cmp.causal_effect()).abs() < 1e-12);
    }

    #[test]
    fn test_income_acts_through_healthcare() {
        let n = net();
        let d1 = n.intervention(Node::Income, 1).unwrap();
        let d0 = n.intervention(Node::Income, 0).unwrap();
        assert!(d1 < d0);
    }

    #[test]
    fn test_zero_mass_condition() {
        let n = CausalNetwork::new(NetworkParams {
            p_smoking: 0.0,
            ..NetworkParams::default()
        })
        .unwrap();
        assert_eq!(n.conditional(Node::Smoking, 1).unwrap(), 0.0);
        // do() still works: the forced value carries weight 1
        assert!(n.intervention(Node::Smoking, 1).unwrap() > 0.2);
    }

    #[test]
    fn test_invalid_queries() {
        let n = net();
        assert!(matches!(
            n.conditional(Node::Disease, 1),
            Err(SimError::InvalidParameters(_))
        ));
        assert!(n.intervention(Node::Disease, 0).is_err());
        assert!(n.conditional(Node::Smoking, 2).is_err());
        assert!(n.edge_strength(Node::Lighter, Node::Disease).is_err());
        assert!(CausalNetwork::new(NetworkParams {
            p_income: 1.5,
            ..NetworkParams::default()
        })
        .is_err());
    }

    #[test]
    fn test_edge_strengths() {
        let strengths = net().edge_strengths().unwrap();
        assert_eq!(strengths.len(), 5);
        assert!((strengths[0].strength - 0.50).abs() < 1e-12);
        assert!((strengths[3].strength - 0.85).abs() < 1e-12);
        for s in &strengths {
            assert!((0.0..=1.0).contains(&s.strength), "{s:?}");
        }
    }

    #[test]
    fn test_node_serde_names() {
        assert_eq!(serde_json::to_string(&Node::Healthcare).unwrap(), "\"healthcare\"");
        let p: NetworkParams = serde_json::from_str(r#"{"p_smoking":0.5}"#).unwrap();
        assert_eq!(p.p_income, 0.30);
        assert_eq!(p.p_smoking, 0.5);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> impl Strategy<Value = NetworkParams> {
        (0.01_f64..0.99, 0.01_f64..0.99, 0.01_f64..0.99).prop_map(|(i, g, s)| NetworkParams {
            p_income: i,
            p_genetics: g,
            p_smoking: s,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn lighter_never_causes_disease(p in params()) {
            let n = CausalNetwork::new(p).unwrap();
            let effect = n.compare(Node::Lighter).unwrap().causal_effect();
            prop_assert!(effect.abs() < 1e-12);
        }

        #[test]
        fn queries_are_probabilities(p in params(), idx in 0_usize..5, v in 0_u8..2) {
            let n = CausalNetwork::new(p).unwrap();
            let node = Node::ENUMERATED[idx];
            let c = n.conditional(node, v).unwrap();
            let d = n.intervention(node, v).unwrap();
            prop_assert!((0.0..=MAX_RISK).contains(&c));
            prop_assert!((0.0..=MAX_RISK).contains(&d));
        }

        #[test]
        fn total_probability(p in params(), idx in 0_usize..5) {
            // P(d) = P(d|X=1)P(X=1) + P(d|X=0)P(X=0)
            let n = CausalNetwork::new(p).unwrap();
            let node = Node::ENUMERATED[idx];
            let bit = node.bit().unwrap();
            let p1: f64 = CausalNetwork::assignments()
                .filter(|a| a.get(bit))
                .map(|a| n.joint(a, None))
                .sum();
            let mixed = n.conditional(node, 1).unwrap() * p1
                + n.conditional(node, 0).unwrap() * (1.0 - p1);
            prop_assert!((mixed - n.marginals().disease).abs() < 1e-12);
        }
    }
}
