// ABOUTME: Hard user constraints checked against plan content: dietary blocklists and avoided exercises
// ABOUTME: Lowercase substring matching with known false-positive exemptions and singularised names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitplan_core::models::DietaryRestriction;
use std::collections::BTreeSet;

/// A forbidden substring and the longer phrases that contain it but are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbiddenFood {
    /// Lowercase token matched as a substring
    pub token: &'static str,
    /// Phrases containing `token` that do not count as a match
    pub exemptions: &'static [&'static str],
}

impl ForbiddenFood {
    const fn plain(token: &'static str) -> Self {
        Self {
            token,
            exemptions: &[],
        }
    }

    const fn except(token: &'static str, exemptions: &'static [&'static str]) -> Self {
        Self { token, exemptions }
    }

    /// Whether `lowered` contains the token outside every exemption
    #[must_use]
    pub fn matches(&self, lowered: &str) -> bool {
        lowered.match_indices(self.token).any(|(at, _)| {
            let end = at + self.token.len();
            !self.exemptions.iter().any(|exemption| {
                lowered
                    .match_indices(exemption)
                    .any(|(start, text)| start <= at && end <= start + text.len())
            })
        })
    }
}

const MEAT: &[ForbiddenFood] = &[
    ForbiddenFood::plain("chicken"),
    ForbiddenFood::except("beef", &["beefsteak tomato"]),
    ForbiddenFood::plain("pork"),
    ForbiddenFood::plain("bacon"),
    ForbiddenFood::except("ham", &["graham", "champagne", "shamrock"]),
    ForbiddenFood::plain("turkey"),
    ForbiddenFood::except("lamb", &["lamb's lettuce"]),
    ForbiddenFood::plain("veal"),
    ForbiddenFood::plain("sausage"),
    ForbiddenFood::plain("salami"),
    ForbiddenFood::plain("pepperoni"),
    ForbiddenFood::plain("prosciutto"),
    ForbiddenFood::plain("chorizo"),
    ForbiddenFood::plain("steak"),
    ForbiddenFood::plain("venison"),
    ForbiddenFood::plain("duck"),
    ForbiddenFood::plain("jerky"),
    ForbiddenFood::plain("meatball"),
    ForbiddenFood::plain("gelatin"),
    ForbiddenFood::plain("lard"),
];

const FISH: &[ForbiddenFood] = &[
    ForbiddenFood::plain("fish"),
    ForbiddenFood::plain("salmon"),
    ForbiddenFood::plain("tuna"),
    ForbiddenFood::plain("cod"),
    ForbiddenFood::plain("tilapia"),
    ForbiddenFood::plain("trout"),
    ForbiddenFood::plain("mackerel"),
    ForbiddenFood::plain("sardine"),
    ForbiddenFood::plain("anchov"),
];

const SHELLFISH: &[ForbiddenFood] = &[
    ForbiddenFood::plain("shrimp"),
    ForbiddenFood::plain("prawn"),
    ForbiddenFood::plain("crab"),
    ForbiddenFood::plain("lobster"),
    ForbiddenFood::plain("shellfish"),
    ForbiddenFood::except("oyster", &["oyster mushroom"]),
    ForbiddenFood::plain("mussel"),
    ForbiddenFood::plain("clam"),
    ForbiddenFood::plain("scallop"),
    ForbiddenFood::plain("squid"),
    ForbiddenFood::plain("calamari"),
    ForbiddenFood::plain("octopus"),
];

const EGG: &[ForbiddenFood] = &[ForbiddenFood::except(
    "egg",
    &["eggplant", "veggie", "egg-free", "eggless", "egg replacer"],
)];

const DAIRY: &[ForbiddenFood] = &[
    ForbiddenFood::except(
        "milk",
        &[
            "almond milk",
            "oat milk",
            "soy milk",
            "coconut milk",
            "rice milk",
            "cashew milk",
            "pea milk",
            "plant milk",
        ],
    ),
    ForbiddenFood::except("cheese", &["vegan cheese", "cashew cheese"]),
    ForbiddenFood::except(
        "yogurt",
        &["coconut yogurt", "soy yogurt", "vegan yogurt", "oat yogurt"],
    ),
    ForbiddenFood::except("yoghurt", &["coconut yoghurt", "soy yoghurt"]),
    ForbiddenFood::except(
        "butter",
        &[
            "peanut butter",
            "almond butter",
            "nut butter",
            "cashew butter",
            "cocoa butter",
            "seed butter",
            "butternut",
            "butter bean",
        ],
    ),
    ForbiddenFood::except("cream", &["coconut cream"]),
    ForbiddenFood::plain("whey"),
    ForbiddenFood::plain("casein"),
    ForbiddenFood::plain("ghee"),
    ForbiddenFood::plain("kefir"),
    ForbiddenFood::plain("paneer"),
];

const HONEY: &[ForbiddenFood] = &[ForbiddenFood::except("honey", &["honeydew"])];

const GLUTEN: &[ForbiddenFood] = &[
    ForbiddenFood::except("wheat", &["buckwheat"]),
    ForbiddenFood::except("bread", &["gluten-free bread"]),
    ForbiddenFood::except(
        "pasta",
        &["gluten-free pasta", "chickpea pasta", "lentil pasta", "rice pasta"],
    ),
    ForbiddenFood::plain("barley"),
    ForbiddenFood::plain("rye"),
    ForbiddenFood::plain("couscous"),
    ForbiddenFood::plain("bulgur"),
    ForbiddenFood::plain("seitan"),
    ForbiddenFood::plain("spelt"),
    ForbiddenFood::plain("bagel"),
    ForbiddenFood::except("noodle", &["rice noodle", "soba noodle", "zucchini noodle"]),
    ForbiddenFood::except("tortilla", &["corn tortilla"]),
];

const NUTS: &[ForbiddenFood] = &[
    ForbiddenFood::plain("peanut"),
    ForbiddenFood::plain("almond"),
    ForbiddenFood::plain("cashew"),
    ForbiddenFood::plain("walnut"),
    ForbiddenFood::plain("pecan"),
    ForbiddenFood::plain("pistachio"),
    ForbiddenFood::plain("hazelnut"),
    ForbiddenFood::plain("macadamia"),
    ForbiddenFood::except(
        "nut",
        &[
            "nutmeg",
            "nutri",
            "coconut",
            "butternut",
            "donut",
            "doughnut",
            "minute",
            "nut-free",
            "water chestnut",
        ],
    ),
];

const ALCOHOL: &[ForbiddenFood] = &[
    ForbiddenFood::plain("wine"),
    ForbiddenFood::plain("beer"),
    ForbiddenFood::plain("alcohol"),
    ForbiddenFood::plain("liqueur"),
];

const PORK: &[ForbiddenFood] = &[
    ForbiddenFood::plain("pork"),
    ForbiddenFood::plain("bacon"),
    ForbiddenFood::except("ham", &["graham", "champagne", "shamrock"]),
    ForbiddenFood::plain("lard"),
    ForbiddenFood::plain("prosciutto"),
    ForbiddenFood::plain("salami"),
    ForbiddenFood::plain("pepperoni"),
    ForbiddenFood::plain("chorizo"),
    ForbiddenFood::except("gelatin", &["halal gelatin", "kosher gelatin"]),
];

/// Blocklist groups applying to a restriction
#[must_use]
pub fn blocklist(restriction: DietaryRestriction) -> Vec<&'static [ForbiddenFood]> {
    match restriction {
        DietaryRestriction::Vegetarian => vec![MEAT, FISH, SHELLFISH, EGG],
        DietaryRestriction::Vegan => vec![MEAT, FISH, SHELLFISH, EGG, DAIRY, HONEY],
        DietaryRestriction::Pescatarian => vec![MEAT],
        DietaryRestriction::GlutenFree => vec![GLUTEN],
        DietaryRestriction::DairyFree => vec![DAIRY],
        DietaryRestriction::NutFree => vec![NUTS],
        DietaryRestriction::Halal => vec![PORK, ALCOHOL],
        DietaryRestriction::Kosher => vec![PORK, SHELLFISH],
    }
}

/// First restriction violated by a food item, with the matched token
#[must_use]
pub fn forbidden_food(
    item: &str,
    restrictions: &BTreeSet<DietaryRestriction>,
) -> Option<(DietaryRestriction, &'static str)> {
    let lowered = item.to_lowercase();
    restrictions.iter().find_map(|restriction| {
        blocklist(*restriction)
            .into_iter()
            .flatten()
            .find(|food| food.matches(&lowered))
            .map(|food| (*restriction, food.token))
    })
}

fn singular(word: &str) -> String {
    if word.len() < 3 {
        return word.to_owned();
    }
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if word.ends_with("ss") || word.ends_with("us") {
        return word.to_owned();
    }
    word.strip_suffix('s').unwrap_or(word).to_owned()
}

/// Lowercase, punctuation-free, singularised form of an exercise name
#[must_use]
pub fn normalise_exercise(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(singular)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exercises the user will not do, pre-normalised for matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvoidedExercises {
    names: Vec<(String, String)>,
}

impl AvoidedExercises {
    /// Build from the profile's avoided-exercise list
    #[must_use]
    pub fn new(avoided: &[String]) -> Self {
        let names = avoided
            .iter()
            .map(|name| (name.trim().to_owned(), normalise_exercise(name)))
            .filter(|(_, normalised)| !normalised.is_empty())
            .collect();
        Self { names }
    }

    /// Avoided name matched by `exercise`, if any
    #[must_use]
    pub fn matched(&self, exercise: &str) -> Option<&str> {
        let normalised = normalise_exercise(exercise);
        self.names
            .iter()
            .find(|(_, avoided)| normalised.contains(avoided.as_str()))
            .map(|(original, _)| original.as_str())
    }

    /// Whether nothing is avoided
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(restriction: DietaryRestriction) -> BTreeSet<DietaryRestriction> {
        BTreeSet::from([restriction])
    }

    #[test]
    fn test_exemptions_prevent_false_positives() {
        let vegetarian = only(DietaryRestriction::Vegetarian);
        assert!(forbidden_food("Grilled eggplant with tahini", &vegetarian).is_none());
        assert!(forbidden_food("Veggie stir fry", &vegetarian).is_none());
        assert!(forbidden_food("Graham crackers", &vegetarian).is_none());
        assert_eq!(
            forbidden_food("2 scrambled eggs", &vegetarian),
            Some((DietaryRestriction::Vegetarian, "egg"))
        );
        assert!(forbidden_food("Ham and eggplant", &vegetarian).is_some());

        let dairy_free = only(DietaryRestriction::DairyFree);
        assert!(forbidden_food("Toast with peanut butter", &dairy_free).is_none());
        assert!(forbidden_food("Oats with almond milk", &dairy_free).is_none());
        assert!(forbidden_food("Peanut butter and butter toast", &dairy_free).is_some());

        let nut_free = only(DietaryRestriction::NutFree);
        assert!(forbidden_food("Oatmeal with nutmeg and coconut", &nut_free).is_none());
        assert!(forbidden_food("Mixed nuts", &nut_free).is_some());
        assert!(forbidden_food("5-minute overnight oats", &nut_free).is_none());
        assert!(forbidden_food("10 minute walnut salad", &nut_free).is_some());
    }

    #[test]
    fn test_pescatarian_allows_fish() {
        let pescatarian = only(DietaryRestriction::Pescatarian);
        assert!(forbidden_food("Baked salmon", &pescatarian).is_none());
        assert!(forbidden_food("Chicken breast", &pescatarian).is_some());
    }

    #[test]
    fn test_avoided_exercises_match_singular_and_plural() {
        let avoided = AvoidedExercises::new(&["Burpees".to_owned(), "Pull-ups".to_owned()]);
        assert_eq!(avoided.matched("burpee"), Some("Burpees"));
        assert_eq!(avoided.matched("Burpees (modified)"), Some("Burpees"));
        assert_eq!(avoided.matched("Weighted pull up"), Some("Pull-ups"));
        assert!(avoided.matched("Push-ups").is_none());
    }

    #[test]
    fn test_singular_keeps_double_s() {
        assert_eq!(normalise_exercise("Bench Presses"), "bench press");
        assert_eq!(normalise_exercise("Dumbbell Flies"), "dumbbell fly");
        assert_eq!(normalise_exercise("Press"), "press");
    }
}
