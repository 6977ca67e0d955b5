//! Knowledge tables and run limits
//!
//! Everything the pipeline "knows" about the domain lives here as data,
//! not code: placeholder phrases, movement synonyms, the curated benchmark
//! table, archetype flavor templates, the targeted override table, and the
//! artifact patterns for library pruning. The compiled-in `Default`
//! carries the working tables; a TOML file can replace any section, which
//! is how tests substitute tables.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Field values keyed by field name (one curated entry / one override)
pub type FieldTable = BTreeMap<String, String>;

/// Domain knowledge tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Case-insensitive substrings marking a value as a placeholder
    pub placeholder_phrases: Vec<String>,

    /// Regex patterns for placeholders that need word boundaries (e.g. tbd)
    pub placeholder_patterns: Vec<String>,

    /// Legacy generic defaults, per field. Recognition only: the pipeline
    /// flags these, it never writes them.
    pub legacy_defaults: BTreeMap<String, Vec<String>>,

    /// Canonical movement label -> accepted spellings
    pub movement_synonyms: BTreeMap<String, Vec<String>>,

    /// Curated benchmark table, keyed by workout name
    pub benchmarks: BTreeMap<String, FieldTable>,

    /// Archetype -> Flavor_Text template
    pub flavor_templates: BTreeMap<String, String>,

    /// Lowercase benchmark names used for archetype detection
    pub benchmark_names: Vec<String>,

    /// Targeted manual overrides, keyed by workout name. Always win.
    pub overrides: BTreeMap<String, FieldTable>,

    /// Fields where placeholder/empty values are nulled at publication
    pub optional_text_fields: Vec<String>,

    /// Fields that must be non-empty in published output
    pub critical_fields: Vec<String>,

    /// Regex patterns identifying parsing artifacts in library entity names
    pub artifact_patterns: Vec<String>,

    /// Entity names longer than this are treated as parsing errors
    pub max_entity_name_len: usize,
}

/// External-call budgets and pacing for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Maximum AI assistant calls per run
    pub max_ai_calls: usize,
    /// Maximum web search calls per run
    pub max_web_calls: usize,
    /// Minimum wall-clock interval between AI calls
    pub ai_min_interval_ms: u64,
    /// Minimum wall-clock interval between web calls
    pub web_min_interval_ms: u64,
    /// Weight rounding precision in kg (0.5, 1.0, 2.5 or 5.0)
    pub weight_precision_kg: f64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_ai_calls: 105,
            max_web_calls: 50,
            ai_min_interval_ms: 1000,
            web_min_interval_ms: 2000,
            weight_precision_kg: 0.5,
        }
    }
}

impl KnowledgeConfig {
    /// Load a TOML config file. Sections absent from the file keep their
    /// compiled-in defaults (serde `default` per field).
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded knowledge tables");
        Ok(config)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn table(pairs: &[(&str, &str)]) -> FieldTable {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        let placeholder_phrases = strings(&[
            "web search performed",
            "no description available",
            "unknown — needs manual review",
            "unknown - needs manual review",
            "needs manual review",
            "[ai generated",
            "this workout can be researched",
            "placeholder",
        ]);

        let placeholder_patterns = strings(&[r"\btbd\b"]);

        let mut legacy_defaults = BTreeMap::new();
        legacy_defaults.insert("Category".into(), strings(&["General", "Unknown", "Unspecified"]));
        legacy_defaults.insert("FormatDuration".into(), strings(&["Unknown", "Unspecified"]));
        legacy_defaults.insert(
            "EquipmentNeeded".into(),
            strings(&["Not specified", "None specified"]),
        );
        legacy_defaults.insert(
            "ScalingOptions".into(),
            strings(&[
                "Standard scaling recommended",
                "Scale as needed",
                "Modify as needed",
                "Standard modifications apply",
                "Standard scaling applies",
            ]),
        );
        legacy_defaults.insert("ScoreType".into(), strings(&["Unspecified", "Unknown"]));
        legacy_defaults.insert(
            "CoachNotes".into(),
            strings(&[
                "No additional notes",
                "Focus on form and pacing",
                "Standard coaching applies",
                "No notes",
                "N/A",
            ]),
        );
        legacy_defaults.insert(
            "Flavor_Text".into(),
            strings(&[
                "Standard workout",
                "A challenging workout",
                "Classic CrossFit workout",
                "Great workout",
                "Effective training",
            ]),
        );
        legacy_defaults.insert(
            "Description".into(),
            strings(&["No description available"]),
        );

        let mut movement_synonyms = BTreeMap::new();
        movement_synonyms.insert(
            "Pull-Up".into(),
            strings(&["pull-up", "pull up", "pullup", "pull-ups", "pull ups", "pullups"]),
        );
        movement_synonyms.insert(
            "Push-Up".into(),
            strings(&["push-up", "push up", "pushup", "push-ups", "push ups", "pushups"]),
        );
        movement_synonyms.insert(
            "Sit-Up".into(),
            strings(&["sit-up", "sit up", "situp", "sit-ups", "sit ups", "situps"]),
        );
        movement_synonyms.insert(
            "Kettlebell Swing".into(),
            strings(&["kettlebell swing", "kb swing", "kettlebell swings", "kb swings"]),
        );
        movement_synonyms.insert(
            "Box Jump".into(),
            strings(&["box jump", "box jumps", "box-jump", "box-jumps"]),
        );
        movement_synonyms.insert(
            "Wall Ball".into(),
            strings(&["wall ball", "wall-ball", "wallball", "wall balls", "wall-ball shots"]),
        );
        movement_synonyms.insert("Burpee".into(), strings(&["burpee", "burpees"]));
        movement_synonyms.insert("Thruster".into(), strings(&["thruster", "thrusters"]));
        movement_synonyms.insert("Deadlift".into(), strings(&["deadlift", "deadlifts", "dead lift"]));
        movement_synonyms.insert(
            "Handstand Push-Up".into(),
            strings(&[
                "handstand push-up",
                "handstand push up",
                "handstand pushup",
                "hspu",
                "handstand push-ups",
            ]),
        );
        movement_synonyms.insert(
            "Double-Under".into(),
            strings(&["double-under", "double under", "double-unders", "double unders", "dubs"]),
        );
        movement_synonyms.insert(
            "Air Squat".into(),
            strings(&["air squat", "air squats", "bodyweight squat", "bodyweight squats"]),
        );

        let mut benchmarks = BTreeMap::new();
        benchmarks.insert(
            "Fran".into(),
            table(&[
                ("Category", "Benchmark (girl/classic)"),
                ("FormatDuration", "For Time"),
                ("ScoreType", "Time"),
                ("Level", "Advanced"),
                ("EquipmentNeeded", "Barbell (43/29.5 kgs), Pull-up Bar"),
                ("MovementTypes", "Weightlifting, Gymnastics"),
            ]),
        );
        benchmarks.insert(
            "Grace".into(),
            table(&[
                ("Category", "Benchmark (girl/classic)"),
                ("FormatDuration", "For Time"),
                ("ScoreType", "Time"),
                ("Level", "Advanced"),
                ("EquipmentNeeded", "Barbell (61/43 kgs)"),
                ("MovementTypes", "Weightlifting"),
            ]),
        );
        benchmarks.insert(
            "Helen".into(),
            table(&[
                ("Category", "Benchmark (girl/classic)"),
                ("FormatDuration", "3 Rounds For Time"),
                ("ScoreType", "Time"),
                ("Level", "Intermediate"),
                ("EquipmentNeeded", "Kettlebell (24/16 kgs), Pull-up Bar"),
                ("MovementTypes", "Monostructural, Weightlifting, Gymnastics"),
            ]),
        );
        benchmarks.insert(
            "Cindy".into(),
            table(&[
                ("Category", "Benchmark (girl/classic)"),
                ("FormatDuration", "AMRAP 20"),
                ("ScoreType", "Rounds + Reps"),
                ("Level", "Beginner"),
                ("EquipmentNeeded", "Pull-up Bar"),
                ("MovementTypes", "Gymnastics, Bodyweight"),
            ]),
        );
        benchmarks.insert(
            "Murph".into(),
            table(&[
                ("Category", "Benchmark (hero)"),
                ("FormatDuration", "For Time"),
                ("ScoreType", "Time"),
                ("Level", "Advanced"),
                ("EquipmentNeeded", "Pull-up Bar, Weighted Vest (optional)"),
                ("MovementTypes", "Monostructural, Gymnastics"),
            ]),
        );

        let mut flavor_templates = BTreeMap::new();
        flavor_templates.insert(
            "benchmark".into(),
            "Classic CrossFit benchmark testing endurance, grit, and pacing. Compare against past scores to measure progress.".into(),
        );
        flavor_templates.insert(
            "amrap".into(),
            "Push for maximum rounds in limited time. Focus on consistent pacing and efficient transitions.".into(),
        );
        flavor_templates.insert(
            "emom".into(),
            "Structured intervals where work starts each minute. Prioritize quality reps, recovery, and rhythm under the clock.".into(),
        );
        flavor_templates.insert(
            "strength".into(),
            "Emphasize progressive overload and form. Track weights and reps to build long-term capacity.".into(),
        );

        let benchmark_names = strings(&[
            "fran", "grace", "helen", "cindy", "karen", "diane", "elizabeth", "isabel",
            "jackie", "nancy", "annie", "eva", "kelly", "lynne", "mary", "nicole",
            "barbara", "chelsea", "amanda", "angie", "murph", "filthy fifty",
            "fight gone bad", "dt", "randy",
        ]);

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "JT".into(),
            table(&[
                ("MovementTypes", "Gymnastics, Bodyweight"),
                ("DifficultyTier", "Advanced"),
                (
                    "Instructions_Clean",
                    "For time, complete 21-15-9 reps of handstand push-ups, ring dips, and push-ups. Finish all handstand push-ups of a round before moving to ring dips, then all ring dips before moving to push-ups.",
                ),
                (
                    "ScalingOptions",
                    "Scale handstand push-ups to pike handstand push-ups or dumbbell strict press. Scale ring dips to banded ring dips or box dips. Scale push-ups to knee push-ups or elevated push-ups. Reduce the rep scheme to 15-12-9 or 12-9-6 for newer athletes.",
                ),
                (
                    "CoachNotes",
                    "This is a pure upper-body gymnastics smash. Break sets early to avoid complete muscular failure, especially on the handstand push-ups and ring dips. Keep transitions tight and move with purpose through the push-ups rather than sprinting the first round and stalling later.",
                ),
            ]),
        );
        overrides.insert(
            "Isabel".into(),
            table(&[
                ("MovementTypes", "Weightlifting"),
                ("DifficultyTier", "Intermediate"),
                (
                    "Instructions_Clean",
                    "For time, complete 30 snatches at the prescribed load. Athletes may power snatch or squat snatch. Choose a weight that allows quick singles or small sets while maintaining safe technique.",
                ),
                (
                    "ScalingOptions",
                    "Reduce the load so you can perform technically sound singles or small sets throughout. Newer athletes can use hang power snatches or light power snatches and reduce to 20 reps if needed.",
                ),
                (
                    "CoachNotes",
                    "Treat this as a fast barbell sprint, not a max-effort strength test. Quick singles with consistent setup are often better than big touch-and-go sets that fall apart. Keep the bar close, brace before each pull, and avoid chasing the clock at the expense of form.",
                ),
            ]),
        );
        overrides.insert(
            "Angie".into(),
            table(&[
                ("MovementTypes", "Gymnastics, Bodyweight"),
                ("DifficultyTier", "Intermediate"),
                (
                    "Instructions_Clean",
                    "For time, complete 100 pull-ups, 100 push-ups, 100 sit-ups, and 100 air squats. Finish all reps of one movement before moving on to the next.",
                ),
                (
                    "ScalingOptions",
                    "Reduce volume to 50 or 75 reps per movement for newer athletes. Scale pull-ups to banded pull-ups or ring rows, and push-ups to knee or elevated push-ups. Keep movement quality high as fatigue builds.",
                ),
                (
                    "CoachNotes",
                    "This is high-volume gymnastics. Break sets early and often to avoid hitting a wall, especially on pull-ups and push-ups. Keep transitions short and maintain a breathing rhythm on sit-ups and squats to stay moving.",
                ),
            ]),
        );
        overrides.insert(
            "Michael".into(),
            table(&[
                ("MovementTypes", "Monostructural, Bodyweight"),
                ("DifficultyTier", "Intermediate"),
                (
                    "Instructions_Clean",
                    "Three rounds for time of an 800-meter run, 50 back extensions, and 50 sit-ups. Complete all reps of each movement before progressing.",
                ),
                (
                    "ScalingOptions",
                    "Shorten the run to 400–600 meters and reduce reps to 30–40 per movement for beginners. Back extensions can be scaled to supermans or good mornings with light load if a GHD is not available.",
                ),
                (
                    "CoachNotes",
                    "Set a sustainable pace from the first run and avoid sprinting early. Keep back extension range controlled and avoid aggressive hyperextension. Use the sit-ups to breathe and keep transitions tight between stations.",
                ),
            ]),
        );
        overrides.insert(
            "Kelly".into(),
            table(&[
                ("MovementTypes", "Monostructural, Weightlifting, Gymnastics"),
                ("DifficultyTier", "Intermediate"),
                (
                    "Instructions_Clean",
                    "Five rounds for time of a 400-meter run, 30 box jumps, and 30 wall-ball shots. Complete all reps of each movement before moving on.",
                ),
                (
                    "ScalingOptions",
                    "Reduce to 3–4 rounds or lower the reps to 20 per movement. Shorten the run to 200–300 meters, use a lower box, and choose a lighter wall ball to maintain smooth, repeatable reps.",
                ),
                (
                    "CoachNotes",
                    "This is a longer grind. Find a sustainable run pace and keep box jumps and wall balls in small, controlled sets. Focus on safe landings, full hip extension, and consistent ball height rather than rushing the early rounds.",
                ),
            ]),
        );

        let optional_text_fields = strings(&[
            "Description",
            "CoachNotes",
            "Flavor_Text",
            "Instructions",
            "Instructions_Clean",
            "MovementTypes",
            "DifficultyTier",
            "ScalingOptions",
            "Warmup",
            "Coaching_Cues",
            "Stimulus",
            "TargetStimulus",
        ]);

        let critical_fields = strings(&["Name", "Category", "FormatDuration", "ScoreType"]);

        let artifact_patterns = strings(&[
            r"^\d+\s+(kg|kgs|kg\)|kgs\)|lb|lbs)$",
            r"^[\d\s\-/]+$",
            r"^\([^\)]*\)\.?$",
            r".*\)\)\.+$",
            r"^\d+\s+\w+\.$",
        ]);

        Self {
            placeholder_phrases,
            placeholder_patterns,
            legacy_defaults,
            movement_synonyms,
            benchmarks,
            flavor_templates,
            benchmark_names,
            overrides,
            optional_text_fields,
            critical_fields,
            artifact_patterns,
            max_entity_name_len: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_tables_present() {
        let cfg = KnowledgeConfig::default();
        assert!(cfg.benchmarks.contains_key("Fran"));
        for name in ["JT", "Isabel", "Angie", "Michael", "Kelly"] {
            assert!(cfg.overrides.contains_key(name), "missing override {name}");
        }
        assert!(cfg.placeholder_phrases.iter().any(|p| p.contains("ai generated")));
        assert_eq!(cfg.critical_fields, vec!["Name", "Category", "FormatDuration", "ScoreType"]);
    }

    #[test]
    fn test_toml_overlay_keeps_defaults_for_absent_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "placeholder_phrases = [\"custom marker\"]").unwrap();

        let cfg = KnowledgeConfig::load_from_path(file.path()).unwrap();
        assert_eq!(cfg.placeholder_phrases, vec!["custom marker"]);
        // Untouched sections keep compiled-in defaults
        assert!(cfg.benchmarks.contains_key("Murph"));
        assert_eq!(cfg.max_entity_name_len, 100);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = KnowledgeConfig::load_from_path(Path::new("/nonexistent/tables.toml"));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_run_limits_defaults() {
        let limits = RunLimits::default();
        assert_eq!(limits.max_ai_calls, 105);
        assert_eq!(limits.ai_min_interval_ms, 1000);
        assert_eq!(limits.web_min_interval_ms, 2000);
        assert!((limits.weight_precision_kg - 0.5).abs() < f64::EPSILON);
    }
}
