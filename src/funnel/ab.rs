//! A/B copy tests with sticky per-session assignment.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::analytics::{Analytics, events};
use crate::wizard::model::storage_keys;
use crate::wizard::session::SessionStore;

/// Test ids read by the wizard.
pub mod test_ids {
    pub const HERO_CTA: &str = "hero_cta_v1";
    pub const MODAL_TITLE: &str = "modal_title_v1";
    pub const EMAIL_CTA: &str = "email_cta_v1";
    pub const URGENCY: &str = "urgency_v1";
    pub const TRUST: &str = "trust_v1";
    pub const PROGRESS: &str = "progress_v1";
    pub const VALUE_PROPS: &str = "value_props_v1";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Control,
    VariantA,
    VariantB,
    VariantC,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::VariantA => "variant_a",
            Self::VariantB => "variant_b",
            Self::VariantC => "variant_c",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "control" => Some(Self::Control),
            "variant_a" => Some(Self::VariantA),
            "variant_b" => Some(Self::VariantB),
            "variant_c" => Some(Self::VariantC),
            _ => None,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One copy experiment.
#[derive(Debug, Clone)]
pub struct AbTest {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub variants: BTreeMap<Variant, Value>,
    /// Relative weights; a missing variant weighs 1.
    pub weights: BTreeMap<Variant, u32>,
}

impl AbTest {
    pub fn new(id: &str, name: &str, variants: [Value; 4]) -> Self {
        let [control, a, b, c] = variants;
        Self {
            id: id.to_string(),
            name: name.to_string(),
            active: true,
            variants: BTreeMap::from([
                (Variant::Control, control),
                (Variant::VariantA, a),
                (Variant::VariantB, b),
                (Variant::VariantC, c),
            ]),
            weights: BTreeMap::new(),
        }
    }

    pub fn with_weights(mut self, weights: impl IntoIterator<Item = (Variant, u32)>) -> Self {
        self.weights = weights.into_iter().collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    fn weight(&self, variant: Variant) -> u32 {
        self.weights.get(&variant).copied().unwrap_or(1)
    }

    /// Weighted random pick across the test's variants.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Variant {
        let total: u32 = self.variants.keys().map(|v| self.weight(*v)).sum();
        if total == 0 {
            return Variant::Control;
        }
        let roll = rng.gen_range(0..total);
        let mut cumulative = 0;
        for variant in self.variants.keys() {
            cumulative += self.weight(*variant);
            if roll < cumulative {
                return *variant;
            }
        }
        Variant::Control
    }
}

/// The funnel's copy experiments.
pub fn default_tests() -> Vec<AbTest> {
    vec![
        AbTest::new(
            test_ids::HERO_CTA,
            "Hero CTA Button Copy",
            [
                json!({ "main": "Get Your Free 90-Day Growth Playbook", "sub": "(Takes 60 seconds)" }),
                json!({ "main": "See Your Revenue Roadmap", "sub": "(5 questions, instant results)" }),
                json!({ "main": "Calculate Your Growth Potential", "sub": "(Personalized in 60 seconds)" }),
                json!({ "main": "Start Growing Revenue Today", "sub": "(Free custom playbook)" }),
            ],
        ),
        AbTest::new(
            test_ids::MODAL_TITLE,
            "Playbook Modal Title",
            [
                json!("Build Your Growth Playbook"),
                json!("Let's 10x Your Pipeline"),
                json!("Your Revenue Roadmap Starts Here"),
                json!("Unlock Your Growth Potential"),
            ],
        ),
        AbTest::new(
            test_ids::EMAIL_CTA,
            "Email Capture Button",
            [
                json!("Send My Playbook"),
                json!("Get My Custom Plan Now"),
                json!("Yes, Send My Growth Plan"),
                json!("Unlock My Playbook"),
            ],
        ),
        AbTest::new(
            test_ids::URGENCY,
            "Urgency Indicators",
            [
                Value::Null,
                json!("3 spots left this quarter"),
                json!("Limited time: Free playbook offer ends soon"),
                json!("Join 127 companies growing with our playbooks"),
            ],
        ),
        AbTest::new(
            test_ids::TRUST,
            "Trust Indicators",
            [
                json!(["Instant delivery", "No credit card", "Personalized plan"]),
                json!(["Used by 500+ B2B companies", "Average 3.2x ROI", "60-second setup"]),
                json!(["Founder-reviewed", "90-day guarantee", "Cancel anytime"]),
                json!(["$2M+ revenue generated", "Fortune 500 trusted", "SOC2 compliant"]),
            ],
        ),
        AbTest::new(
            test_ids::PROGRESS,
            "Progress Incentives",
            [
                json!("Question {current} of {total}"),
                json!("Building your plan... {percent}% complete"),
                json!("Almost there! {remaining} questions left"),
                json!("Calculating {value} in potential revenue..."),
            ],
        ),
        AbTest::new(
            test_ids::VALUE_PROPS,
            "Value Propositions",
            [
                json!({ "headline": "Your playbook is ready!", "subhead": "Enter your email to receive the full PDF instantly" }),
                json!({ "headline": "Your $1.2M revenue roadmap is ready", "subhead": "See exactly how to hit your growth targets" }),
                json!({ "headline": "We found 3 quick wins for you", "subhead": "Get your personalized action plan now" }),
                json!({ "headline": "Your competitors don't want you to see this", "subhead": "Unlock the exact playbook we use for 8-figure exits" }),
            ],
        ),
    ]
}

/// Assigns and remembers variants for the current session.
pub struct AbTests {
    tests: Vec<AbTest>,
    store: Arc<dyn SessionStore>,
    analytics: Arc<dyn Analytics>,
}

impl AbTests {
    pub fn new(
        tests: Vec<AbTest>,
        store: Arc<dyn SessionStore>,
        analytics: Arc<dyn Analytics>,
    ) -> Self {
        Self {
            tests,
            store,
            analytics,
        }
    }

    pub fn get(&self, test_id: &str) -> Option<&AbTest> {
        self.tests.iter().find(|t| t.id == test_id)
    }

    /// Variant for this session, assigning one on first use.
    pub fn variant(&self, test_id: &str) -> Variant {
        self.variant_with(test_id, &mut rand::thread_rng())
    }

    pub fn variant_with<R: Rng>(&self, test_id: &str, rng: &mut R) -> Variant {
        let Some(test) = self.get(test_id).filter(|t| t.active) else {
            return Variant::Control;
        };

        let key = storage_key(test_id);
        if let Some(stored) = self.store.get(&key).as_deref().and_then(Variant::parse) {
            if test.variants.contains_key(&stored) {
                return stored;
            }
        }

        let variant = test.pick(rng);
        self.store.set(&key, variant.as_str());
        debug!(test_id, %variant, "Assigned A/B variant");
        self.analytics.record(
            events::AB_TEST_ASSIGNED,
            json!({ "test_id": test_id, "test_name": test.name, "variant": variant }),
        );
        variant
    }

    /// Copy for this session's variant, optionally narrowed by a dotted path.
    ///
    /// Unknown tests and missing paths yield `Value::Null`.
    pub fn test_value(&self, test_id: &str, path: Option<&str>) -> Value {
        let Some(test) = self.get(test_id) else {
            return Value::Null;
        };
        let variant = self.variant(test_id);
        let value = test.variants.get(&variant).cloned().unwrap_or(Value::Null);

        match path {
            Some(path) if value.is_object() => path
                .split('.')
                .try_fold(&value, |v, key| v.get(key))
                .cloned()
                .unwrap_or(Value::Null),
            _ => value,
        }
    }

    /// Convenience for string-valued copy.
    pub fn test_text(&self, test_id: &str) -> Option<String> {
        self.test_value(test_id, None).as_str().map(String::from)
    }

    /// Attribute a conversion to whatever variant this session saw.
    pub fn track_conversion(&self, test_id: &str, event: &str) {
        let variant = self
            .store
            .get(&storage_key(test_id))
            .unwrap_or_else(|| Variant::Control.as_str().to_string());
        self.analytics.record(
            events::AB_TEST_CONVERSION,
            json!({ "test_id": test_id, "variant": variant, "event": event }),
        );
    }
}

fn storage_key(test_id: &str) -> String {
    format!("{}{}", storage_keys::AB_PREFIX, test_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::session::MemorySessionStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(String, Value)>>);

    impl Analytics for Capture {
        fn record(&self, event: &str, properties: Value) {
            self.0.lock().unwrap().push((event.to_string(), properties));
        }
    }

    fn ab() -> (Arc<MemorySessionStore>, Arc<Capture>, AbTests) {
        let store = MemorySessionStore::new();
        let capture = Arc::new(Capture::default());
        let tests = AbTests::new(default_tests(), store.clone(), capture.clone());
        (store, capture, tests)
    }

    #[test]
    fn assignment_is_sticky_and_tracked_once() {
        let (store, capture, tests) = ab();
        let mut rng = StdRng::seed_from_u64(7);

        let first = tests.variant_with(test_ids::MODAL_TITLE, &mut rng);
        for _ in 0..10 {
            assert_eq!(tests.variant_with(test_ids::MODAL_TITLE, &mut rng), first);
        }
        assert_eq!(
            store.get("ab_modal_title_v1").as_deref(),
            Some(first.as_str())
        );

        let events = capture.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "ab_test_assigned");
    }

    #[test]
    fn unknown_and_inactive_tests_are_control() {
        let store = MemorySessionStore::new();
        let tests = AbTests::new(
            vec![AbTest::new("off", "Off", [json!(1), json!(2), json!(3), json!(4)]).inactive()],
            store.clone(),
            Arc::new(Capture::default()),
        );
        assert_eq!(tests.variant("off"), Variant::Control);
        assert_eq!(tests.variant("missing"), Variant::Control);
        assert!(store.is_empty());
    }

    #[test]
    fn zero_weights_pin_a_variant() {
        let test = AbTest::new("w", "Weighted", [json!(0), json!(1), json!(2), json!(3)])
            .with_weights([
                (Variant::Control, 0),
                (Variant::VariantA, 0),
                (Variant::VariantB, 5),
                (Variant::VariantC, 0),
            ]);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(test.pick(&mut rng), Variant::VariantB);
        }
    }

    #[test]
    fn test_value_follows_dotted_path() {
        let (store, _capture, tests) = ab();
        store.set("ab_hero_cta_v1", "variant_a");

        assert_eq!(
            tests.test_value(test_ids::HERO_CTA, Some("main")),
            json!("See Your Revenue Roadmap")
        );
        assert_eq!(tests.test_value(test_ids::HERO_CTA, Some("nope.deeper")), Value::Null);
        assert_eq!(tests.test_value("missing", None), Value::Null);
    }

    #[test]
    fn conversion_uses_stored_variant() {
        let (store, capture, tests) = ab();
        store.set("ab_email_cta_v1", "variant_c");

        tests.track_conversion(test_ids::EMAIL_CTA, "email_captured");
        let events = capture.0.lock().unwrap();
        assert_eq!(events[0].0, "ab_test_conversion");
        assert_eq!(events[0].1["variant"], "variant_c");
        assert_eq!(events[0].1["event"], "email_captured");
    }
}
