//! Built-in medication catalog and protocol library.
//!
//! This module provides the reference medications, their dosing rules and
//! the treatment algorithms shipped with the system, plus the read-only
//! queries the front ends run against them.

use crate::protocol::ProtocolGraph;
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

/// Cached default catalog - built once and never mutated
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog of medications and protocols
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn build_default_catalog_internal() -> Catalog {
    let mut medications = HashMap::new();
    for med in default_medications() {
        medications.insert(med.id.clone(), med);
    }

    let mut protocols = HashMap::new();
    for (info, nodes) in default_protocols() {
        match ProtocolGraph::new(nodes) {
            Ok(graph) => {
                protocols.insert(info.id.clone(), ProtocolDefinition { info, graph });
            }
            Err(errors) => {
                for err in errors {
                    tracing::error!("Built-in protocol '{}' is invalid: {}", info.id, err);
                }
            }
        }
    }

    tracing::debug!(
        "Built catalog with {} medications and {} protocols",
        medications.len(),
        protocols.len()
    );

    Catalog {
        medications,
        protocols,
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn alert(level: AlertLevel, text: &str) -> MedicationAlert {
    MedicationAlert {
        level,
        text: text.into(),
    }
}

fn dosage(population: &str, details: &str) -> Dosage {
    Dosage {
        population: population.into(),
        details: details.into(),
        rule: None,
    }
}

fn calculated(population: &str, details: &str, rule: DosingRule) -> Dosage {
    Dosage {
        rule: Some(rule),
        ..dosage(population, details)
    }
}

fn onset(onset: &str, duration: &str) -> Option<OnsetDuration> {
    Some(OnsetDuration {
        onset: onset.into(),
        duration: duration.into(),
    })
}

fn default_medications() -> Vec<Medication> {
    use ConcentrationUnit::MgPerMl;
    use DoseUnit::{Microgram, Milligram};

    vec![
        // ====================================================================
        // Cardiac
        // ====================================================================
        Medication {
            id: "epinephrine".into(),
            name: "Epinephrine (Adrenaline)".into(),
            generic_name: Some("Epinephrine".into()),
            category: "Cardiac".into(),
            subcategory: Some("Sympathomimetic, Vasopressor".into()),
            description: "A potent sympathomimetic amine that stimulates both alpha and beta-adrenergic receptors, leading to increased heart rate, myocardial contractility, and systemic vascular resistance.".into(),
            indications: list(&[
                "Cardiac Arrest (Asystole/PEA, VF/pVT)",
                "Anaphylaxis",
                "Symptomatic Bradycardia",
                "Severe Asthma",
            ]),
            contraindications: list(&[
                "None in a life-threatening emergency",
                "Use with caution in patients with hypertension, ischemic heart disease",
            ]),
            dosages: vec![
                dosage(
                    "Adult Cardiac Arrest",
                    "1 mg (10 mL of 1:10,000 solution) IV/IO every 3-5 minutes.",
                ),
                calculated(
                    "Pediatric Cardiac Arrest",
                    "0.01 mg/kg (0.1 mL/kg of 1:10,000 solution) IV/IO every 3-5 minutes. Max dose 1 mg.",
                    DosingRule::per_kg(0.01, Milligram)
                        .max_dose(1.0)
                        .concentration(0.1, MgPerMl),
                ),
                dosage("Anaphylaxis (Adult)", "0.3-0.5 mg (of 1:1,000 solution) IM."),
                calculated(
                    "Anaphylaxis (Pediatric)",
                    "0.01 mg/kg (of 1:1,000 solution) IM. Max dose 0.3 mg.",
                    DosingRule::per_kg(0.01, Milligram)
                        .max_dose(0.3)
                        .concentration(1.0, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "ET"]),
                notes: "Follow IV/IO push with a 20 mL saline flush. ET route is least preferred and requires a higher dose.".into(),
                monitoring: list(&["Heart rate", "Blood pressure", "ECG", "Urine output"]),
            },
            alerts: vec![
                alert(
                    AlertLevel::HighAlert,
                    "Dosage concentration errors are common. Double-check 1:1,000 vs 1:10,000 strength.",
                ),
                alert(
                    AlertLevel::Caution,
                    "Can cause significant tachycardia and hypertension.",
                ),
            ],
            concentrations: list(&["1 mg/mL (1:1,000)", "0.1 mg/mL (1:10,000)"]),
            algorithms: list(&[
                "PALS Cardiac Arrest Algorithm",
                "ACLS Cardiac Arrest Algorithm",
                "PALS/ACLS Bradycardia Algorithm",
            ]),
            look_alike_sound_alike: list(&["Ephedrine"]),
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("1-2 minutes IV", "5-10 minutes"),
            interactions: vec![],
            reversal: None,
        },
        Medication {
            id: "atropine".into(),
            name: "Atropine Sulfate".into(),
            generic_name: Some("Atropine".into()),
            category: "Cardiac".into(),
            subcategory: Some("Anticholinergic".into()),
            description: "Competitive antagonist of acetylcholine at muscarinic receptors, increasing heart rate and improving AV conduction.".into(),
            indications: list(&[
                "Symptomatic Bradycardia",
                "Organophosphate poisoning",
                "Premedication to reduce secretions",
            ]),
            contraindications: list(&["Angle-closure glaucoma", "Myasthenia gravis", "Tachycardia"]),
            dosages: vec![
                calculated(
                    "Pediatric Bradycardia",
                    "0.02 mg/kg IV/IO (minimum 0.1 mg, maximum single dose 0.5 mg).",
                    DosingRule::per_kg(0.02, Milligram).min_dose(0.1).max_dose(0.5),
                ),
                dosage(
                    "Adult Bradycardia",
                    "0.5 mg IV/IO every 3-5 minutes. Max total dose 3 mg.",
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "ET"]),
                notes: "May cause paradoxical bradycardia with doses <0.5 mg in adults.".into(),
                monitoring: list(&["Heart rate", "Blood pressure", "ECG", "Pupil size"]),
            },
            alerts: vec![
                alert(
                    AlertLevel::Caution,
                    "Doses <0.5 mg may cause paradoxical bradycardia in adults.",
                ),
                alert(
                    AlertLevel::Info,
                    "May cause anticholinergic effects: dry mouth, blurred vision, urinary retention.",
                ),
            ],
            concentrations: list(&["0.1 mg/mL", "0.4 mg/mL"]),
            algorithms: list(&["ACLS Bradycardia Algorithm", "PALS Bradycardia Algorithm"]),
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("1-2 minutes IV", "4-6 hours"),
            interactions: vec![],
            reversal: None,
        },
        Medication {
            id: "amiodarone".into(),
            name: "Amiodarone".into(),
            generic_name: None,
            category: "Cardiac".into(),
            subcategory: Some("Antiarrhythmic (Class III)".into()),
            description: "Prolongs action potential duration and refractory period, effective for both atrial and ventricular arrhythmias.".into(),
            indications: list(&[
                "VF/pVT refractory to defibrillation",
                "Stable wide-complex tachycardia",
                "Atrial fibrillation with RVR",
            ]),
            contraindications: list(&[
                "Severe sinus node dysfunction",
                "Second/third-degree heart block",
                "Cardiogenic shock",
            ]),
            dosages: vec![
                dosage(
                    "Adult VF/pVT",
                    "300 mg IV/IO push, then 150 mg in 3-5 minutes if needed.",
                ),
                calculated(
                    "Pediatric VF/pVT",
                    "5 mg/kg IV/IO bolus, may repeat up to 15 mg/kg total.",
                    DosingRule::per_kg(5.0, Milligram)
                        .max_dose(300.0)
                        .concentration(50.0, MgPerMl),
                ),
                dosage(
                    "Adult Stable Tachycardia",
                    "150 mg IV over 10 minutes, then 1 mg/min infusion.",
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO"]),
                notes: "Must be given through central line or large peripheral IV. Compatible with D5W only.".into(),
                monitoring: list(&[
                    "ECG",
                    "Blood pressure",
                    "Liver function",
                    "Thyroid function",
                    "Pulmonary function",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::HighAlert,
                    "Can cause severe hypotension, especially with rapid administration.",
                ),
                alert(
                    AlertLevel::Caution,
                    "Multiple drug interactions. Monitor for prolonged QT interval.",
                ),
                alert(
                    AlertLevel::BlackBox,
                    "Pulmonary toxicity can be fatal. Hepatic toxicity possible.",
                ),
            ],
            concentrations: list(&["50 mg/mL"]),
            algorithms: list(&["ACLS Cardiac Arrest Algorithm", "ACLS Tachycardia Algorithm"]),
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::D),
            onset_duration: onset("1-3 hours", "Weeks to months"),
            interactions: list(&["Warfarin", "Digoxin", "QT-prolonging agents"]),
            reversal: None,
        },
        Medication {
            id: "adenosine".into(),
            name: "Adenosine".into(),
            generic_name: None,
            category: "Cardiac".into(),
            subcategory: Some("Antidysrhythmic".into()),
            description: "Slows conduction time through the A-V node, can interrupt the re-entry pathways through the A-V node, and can restore normal sinus rhythm in patients with paroxysmal supraventricular tachycardia (PSVT).".into(),
            indications: list(&["Stable, narrow-complex Supraventricular Tachycardia (SVT)"]),
            contraindications: list(&[
                "Second- or third-degree A-V block",
                "Sick sinus syndrome",
                "Known hypersensitivity to adenosine",
            ]),
            dosages: vec![
                dosage(
                    "Adult SVT",
                    "First dose: 6 mg rapid IV push over 1-3 seconds. Second dose: If SVT does not convert in 1-2 minutes, give 12 mg rapid IV push.",
                ),
                calculated(
                    "Pediatric SVT (First Dose)",
                    "0.1 mg/kg (max 6 mg) rapid IV/IO push.",
                    DosingRule::per_kg(0.1, Milligram)
                        .max_dose(6.0)
                        .concentration(3.0, MgPerMl),
                ),
                calculated(
                    "Pediatric SVT (Second Dose)",
                    "0.2 mg/kg (max 12 mg) rapid IV/IO push.",
                    DosingRule::per_kg(0.2, Milligram)
                        .max_dose(12.0)
                        .concentration(3.0, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO"]),
                notes: "Administer directly into a vein or into an IV line as close to the patient as possible. Follow immediately with a rapid 20 mL saline flush.".into(),
                monitoring: list(&["ECG continuously", "Blood pressure"]),
            },
            alerts: vec![
                alert(
                    AlertLevel::Info,
                    "Patients may experience a brief period of asystole, chest pain, or flushing.",
                ),
                alert(
                    AlertLevel::Caution,
                    "Very short half-life (~10 seconds). Must be administered rapidly.",
                ),
            ],
            concentrations: list(&["3 mg/mL"]),
            algorithms: list(&["ACLS Tachycardia Algorithm"]),
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("10-20 seconds", "1-2 minutes"),
            interactions: vec![],
            reversal: None,
        },
        // ====================================================================
        // Pain Management & Sedation
        // ====================================================================
        Medication {
            id: "midazolam".into(),
            name: "Midazolam (Versed)".into(),
            generic_name: Some("Midazolam".into()),
            category: "Sedation".into(),
            subcategory: Some("Benzodiazepine, Anticonvulsant".into()),
            description: "A short-acting benzodiazepine with anxiolytic, sedative, anticonvulsant, and muscle-relaxant properties.".into(),
            indications: list(&[
                "Seizures / Status Epilepticus",
                "Sedation for procedures (e.g., cardioversion)",
                "Chemical restraint",
            ]),
            contraindications: list(&[
                "Acute narrow-angle glaucoma",
                "Shock",
                "Hypersensitivity to benzodiazepines",
            ]),
            dosages: vec![
                dosage(
                    "Adult Seizure",
                    "5-10 mg IM/IN, or 2-5 mg IV/IO over 2 minutes.",
                ),
                calculated(
                    "Pediatric Seizure",
                    "0.1-0.2 mg/kg IM/IN, max single dose 5 mg.",
                    DosingRule::per_kg_range(0.1, 0.2, Milligram)
                        .max_dose(5.0)
                        .concentration(5.0, MgPerMl),
                ),
                dosage("Adult Sedation", "1-2.5 mg slow IV push."),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "IN (Intranasal)"]),
                notes: "Monitor respiratory status and blood pressure closely. Have reversal agent (flumazenil) available.".into(),
                monitoring: list(&[
                    "Respiratory rate",
                    "Oxygen saturation",
                    "Blood pressure",
                    "Level of consciousness",
                ]),
            },
            alerts: vec![alert(
                AlertLevel::HighAlert,
                "Can cause respiratory depression and hypotension, especially when given rapidly or with opioids.",
            )],
            concentrations: list(&["1 mg/mL", "5 mg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: list(&["lorazepam", "diazepam"]),
            pregnancy_category: Some(PregnancyCategory::D),
            onset_duration: onset("1-3 minutes IV, 5-15 minutes IM", "2-6 hours"),
            interactions: list(&["Opioids", "Alcohol"]),
            reversal: Some("Flumazenil".into()),
        },
        Medication {
            id: "fentanyl".into(),
            name: "Fentanyl".into(),
            generic_name: None,
            category: "Pain Management".into(),
            subcategory: Some("Opioid Analgesic".into()),
            description: "A potent synthetic opioid analgesic with a rapid onset and short duration of action.".into(),
            indications: list(&["Severe pain management", "Analgesia for procedures"]),
            contraindications: list(&[
                "Severe respiratory depression",
                "Known hypersensitivity",
                "Use with caution in patients with head injuries or hypotension",
            ]),
            dosages: vec![
                dosage(
                    "Adult Pain",
                    "25-100 mcg slow IV/IO/IM push over 1-2 minutes. Repeat every 5-10 minutes as needed.",
                ),
                calculated(
                    "Pediatric Pain",
                    "1-2 mcg/kg slow IV/IO/IM/IN.",
                    DosingRule::per_kg_range(1.0, 2.0, Microgram)
                        .concentration(50.0, ConcentrationUnit::McgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "IN (Intranasal)"]),
                notes: "Monitor for respiratory depression. Naloxone should be readily available as a reversal agent.".into(),
                monitoring: list(&[
                    "Respiratory rate",
                    "Oxygen saturation",
                    "Blood pressure",
                    "Pain level",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::HighAlert,
                    "High potential for respiratory depression and apnea. 100x more potent than morphine.",
                ),
                alert(
                    AlertLevel::Caution,
                    "Rapid IV administration may cause chest wall rigidity.",
                ),
            ],
            concentrations: list(&["50 mcg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("1-2 minutes IV, 7-15 minutes IM", "30-60 minutes"),
            interactions: list(&["Benzodiazepines", "MAO inhibitors"]),
            reversal: Some("Naloxone".into()),
        },
        Medication {
            id: "morphine".into(),
            name: "Morphine Sulfate".into(),
            generic_name: Some("Morphine".into()),
            category: "Pain Management".into(),
            subcategory: Some("Opioid Analgesic".into()),
            description: "Natural opioid analgesic that binds to mu-opioid receptors, providing analgesia and sedation.".into(),
            indications: list(&["Moderate to severe pain", "Chest pain (MI)", "Pulmonary edema"]),
            contraindications: list(&[
                "Severe respiratory depression",
                "Paralytic ileus",
                "Severe asthma",
                "Head injury with increased ICP",
            ]),
            dosages: vec![
                dosage("Adult Pain", "2-10 mg IV/IO every 5-15 minutes as needed."),
                calculated(
                    "Pediatric Pain",
                    "0.1-0.2 mg/kg IV/IO/IM every 4 hours as needed.",
                    DosingRule::per_kg_range(0.1, 0.2, Milligram),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "SQ"]),
                notes: "Administer slowly to reduce risk of hypotension and respiratory depression.".into(),
                monitoring: list(&[
                    "Respiratory rate",
                    "Blood pressure",
                    "Pain level",
                    "Sedation level",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::HighAlert,
                    "Can cause significant respiratory depression, especially in elderly patients.",
                ),
                alert(
                    AlertLevel::Caution,
                    "May cause hypotension and histamine release.",
                ),
            ],
            concentrations: list(&[
                "1 mg/mL", "2 mg/mL", "4 mg/mL", "5 mg/mL", "8 mg/mL", "10 mg/mL",
            ]),
            algorithms: vec![],
            look_alike_sound_alike: list(&["hydromorphone"]),
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("5-10 minutes IV", "3-4 hours"),
            interactions: vec![],
            reversal: Some("Naloxone".into()),
        },
        Medication {
            id: "ketamine".into(),
            name: "Ketamine".into(),
            generic_name: None,
            category: "Sedation".into(),
            subcategory: Some("Dissociative Anesthetic".into()),
            description: "NMDA receptor antagonist providing anesthesia, analgesia, and amnesia while maintaining airway reflexes.".into(),
            indications: list(&[
                "Procedural sedation",
                "Analgesia",
                "Intubation induction",
                "Status asthmaticus",
            ]),
            contraindications: list(&[
                "Increased intracranial pressure",
                "Severe hypertension",
                "Psychosis",
            ]),
            dosages: vec![
                dosage(
                    "Adult Procedural Sedation",
                    "1-2 mg/kg IV over 1-2 minutes or 4-5 mg/kg IM.",
                ),
                calculated(
                    "Pediatric Procedural Sedation",
                    "1-2 mg/kg IV or 3-4 mg/kg IM.",
                    DosingRule::per_kg_range(1.0, 2.0, Milligram).concentration(10.0, MgPerMl),
                ),
                dosage(
                    "Adult Analgesia",
                    "0.1-0.5 mg/kg IV for sub-dissociative analgesia.",
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM"]),
                notes: "Maintain airway equipment available. May cause emergence reactions - consider co-administration of benzodiazepine.".into(),
                monitoring: list(&[
                    "Airway patency",
                    "Oxygen saturation",
                    "Blood pressure",
                    "Emergence reactions",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::Caution,
                    "May cause emergence reactions (hallucinations, delirium). Consider prophylactic benzodiazepine.",
                ),
                alert(
                    AlertLevel::Info,
                    "Preserves airway reflexes and respiratory drive unlike other anesthetics.",
                ),
            ],
            concentrations: list(&["10 mg/mL", "50 mg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::B),
            onset_duration: onset(
                "1-2 minutes IV, 3-8 minutes IM",
                "10-15 minutes IV, 15-30 minutes IM",
            ),
            interactions: vec![],
            reversal: None,
        },
        // ====================================================================
        // Respiratory
        // ====================================================================
        Medication {
            id: "albuterol".into(),
            name: "Albuterol (Salbutamol)".into(),
            generic_name: Some("Salbutamol".into()),
            category: "Respiratory".into(),
            subcategory: Some("Beta-2 Agonist Bronchodilator".into()),
            description: "Selective beta-2 adrenergic receptor agonist that causes bronchial smooth muscle relaxation.".into(),
            indications: list(&[
                "Bronchospasm",
                "Asthma exacerbation",
                "COPD exacerbation",
                "Hyperkalemia",
            ]),
            contraindications: list(&[
                "Hypersensitivity to albuterol",
                "Use with caution in cardiac arrhythmias",
            ]),
            dosages: vec![
                dosage(
                    "Adult Nebulizer",
                    "2.5-5 mg in 3 mL normal saline via nebulizer every 20 minutes x3, then every 2-4 hours.",
                ),
                dosage(
                    "Adult MDI",
                    "2-8 puffs every 20 minutes for 3 doses, then every 1-4 hours as needed.",
                ),
                calculated(
                    "Pediatric Nebulizer",
                    "0.15 mg/kg (minimum 2.5 mg) in 3 mL normal saline every 20 minutes x3.",
                    DosingRule::per_kg(0.15, Milligram)
                        .min_dose(2.5)
                        .concentration(5.0, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["Inhalation (Nebulizer)", "Inhalation (MDI)"]),
                notes: "Monitor for tachycardia and tremor. May be mixed with ipratropium for enhanced effect.".into(),
                monitoring: list(&[
                    "Peak flow",
                    "Oxygen saturation",
                    "Heart rate",
                    "Respiratory rate",
                ]),
            },
            alerts: vec![alert(
                AlertLevel::Caution,
                "May cause tachycardia, tremor, and hypokalemia with frequent dosing.",
            )],
            concentrations: list(&["0.5% (5 mg/mL)", "MDI 90 mcg/puff"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("5-15 minutes", "3-6 hours"),
            interactions: vec![],
            reversal: None,
        },
        Medication {
            id: "ipratropium".into(),
            name: "Ipratropium Bromide".into(),
            generic_name: Some("Ipratropium".into()),
            category: "Respiratory".into(),
            subcategory: Some("Anticholinergic Bronchodilator".into()),
            description: "Quaternary ammonium anticholinergic that blocks muscarinic receptors in bronchial smooth muscle.".into(),
            indications: list(&[
                "Bronchospasm",
                "COPD exacerbation",
                "Asthma (adjunct to beta-agonists)",
            ]),
            contraindications: list(&[
                "Hypersensitivity to atropine or derivatives",
                "Angle-closure glaucoma",
            ]),
            dosages: vec![
                dosage(
                    "Adult Nebulizer",
                    "0.5 mg (2.5 mL of 0.02% solution) every 20 minutes x3, then every 2-4 hours.",
                ),
                dosage(
                    "Adult MDI",
                    "2-3 puffs every 20 minutes for 3 doses, then every 2-4 hours as needed.",
                ),
                dosage(
                    "Pediatric Nebulizer",
                    "0.25-0.5 mg every 20 minutes x3, then every 2-4 hours.",
                ),
            ],
            administration: Administration {
                routes: list(&["Inhalation (Nebulizer)", "Inhalation (MDI)"]),
                notes: "Often combined with albuterol for synergistic effect. Rinse mouth after use.".into(),
                monitoring: list(&["Peak flow", "Oxygen saturation", "Heart rate"]),
            },
            alerts: vec![alert(
                AlertLevel::Info,
                "Less likely to cause tachycardia compared to beta-agonists.",
            )],
            concentrations: list(&["0.02% (0.5 mg/2.5 mL)", "MDI 17 mcg/puff"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::B),
            onset_duration: onset("15 minutes", "3-4 hours"),
            interactions: vec![],
            reversal: None,
        },
        // ====================================================================
        // Neurological
        // ====================================================================
        Medication {
            id: "lorazepam".into(),
            name: "Lorazepam (Ativan)".into(),
            generic_name: Some("Lorazepam".into()),
            category: "Neurological".into(),
            subcategory: Some("Benzodiazepine Anticonvulsant".into()),
            description: "Intermediate-acting benzodiazepine with anticonvulsant, anxiolytic, and sedative properties.".into(),
            indications: list(&[
                "Status epilepticus",
                "Seizures",
                "Agitation",
                "Procedural sedation",
            ]),
            contraindications: list(&[
                "Severe respiratory depression",
                "Acute narrow-angle glaucoma",
                "Severe hepatic insufficiency",
            ]),
            dosages: vec![
                dosage(
                    "Adult Status Epilepticus",
                    "4 mg IV over 2 minutes, may repeat in 10-15 minutes if seizures persist.",
                ),
                calculated(
                    "Pediatric Status Epilepticus",
                    "0.1 mg/kg IV/IO (max 4 mg), may repeat once in 10-15 minutes.",
                    DosingRule::per_kg(0.1, Milligram)
                        .max_dose(4.0)
                        .concentration(2.0, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM"]),
                notes: "Longer duration than midazolam. Have flumazenil available for reversal.".into(),
                monitoring: list(&[
                    "Respiratory rate",
                    "Blood pressure",
                    "Level of consciousness",
                    "Seizure activity",
                ]),
            },
            alerts: vec![alert(
                AlertLevel::HighAlert,
                "Can cause respiratory depression, especially when combined with opioids.",
            )],
            concentrations: list(&["2 mg/mL", "4 mg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: list(&["midazolam", "diazepam"]),
            pregnancy_category: Some(PregnancyCategory::D),
            onset_duration: onset("1-3 minutes IV", "6-8 hours"),
            interactions: list(&["Opioids"]),
            reversal: Some("Flumazenil".into()),
        },
        // ====================================================================
        // Antidotes
        // ====================================================================
        Medication {
            id: "naloxone".into(),
            name: "Naloxone (Narcan)".into(),
            generic_name: Some("Naloxone".into()),
            category: "Antidotes".into(),
            subcategory: Some("Opioid Antagonist".into()),
            description: "Competitive opioid receptor antagonist that reverses opioid-induced respiratory depression.".into(),
            indications: list(&[
                "Opioid overdose",
                "Opioid-induced respiratory depression",
                "Reversal of opioid effects",
            ]),
            contraindications: list(&["Hypersensitivity to naloxone"]),
            dosages: vec![
                dosage(
                    "Adult Opioid Overdose",
                    "0.4-2 mg IV/IO/IM, may repeat every 2-3 minutes. Max 10 mg.",
                ),
                calculated(
                    "Pediatric Opioid Overdose",
                    "0.01 mg/kg IV/IO/IM, may repeat every 2-3 minutes.",
                    DosingRule::per_kg(0.01, Milligram).concentration(0.4, MgPerMl),
                ),
                dosage(
                    "Adult Intranasal",
                    "4 mg (2 mg per nostril) IN, may repeat every 2-3 minutes.",
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO", "IM", "IN (Intranasal)", "ET"]),
                notes: "Duration shorter than most opioids - may need repeated doses. May precipitate withdrawal in opioid-dependent patients.".into(),
                monitoring: list(&[
                    "Respiratory rate",
                    "Level of consciousness",
                    "Blood pressure",
                    "Withdrawal symptoms",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::Caution,
                    "Duration of action (30-60 min) is shorter than most opioids. Patient may re-narcotize.",
                ),
                alert(
                    AlertLevel::Info,
                    "May precipitate acute withdrawal syndrome in opioid-dependent patients.",
                ),
            ],
            concentrations: list(&["0.4 mg/mL", "1 mg/mL", "4 mg/0.1 mL autoinjector"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::B),
            onset_duration: onset("1-2 minutes IV, 2-5 minutes IM", "30-60 minutes"),
            interactions: vec![],
            reversal: None,
        },
        Medication {
            id: "flumazenil".into(),
            name: "Flumazenil (Romazicon)".into(),
            generic_name: Some("Flumazenil".into()),
            category: "Antidotes".into(),
            subcategory: Some("Benzodiazepine Antagonist".into()),
            description: "Competitive benzodiazepine receptor antagonist that reverses benzodiazepine-induced sedation.".into(),
            indications: list(&[
                "Benzodiazepine overdose",
                "Reversal of procedural sedation",
                "Suspected benzodiazepine poisoning",
            ]),
            contraindications: list(&[
                "Tricyclic antidepressant overdose",
                "Seizure-prone patients",
                "Chronic benzodiazepine use",
            ]),
            dosages: vec![
                dosage(
                    "Adult Overdose",
                    "0.2 mg IV over 30 seconds, then 0.3 mg after 30 seconds if needed. Additional 0.5 mg doses every minute to max 3 mg.",
                ),
                calculated(
                    "Pediatric Overdose",
                    "0.01 mg/kg IV (max 0.2 mg), may repeat every minute to max 1 mg total.",
                    DosingRule::per_kg(0.01, Milligram)
                        .max_dose(0.2)
                        .concentration(0.1, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO"]),
                notes: "Use with extreme caution in patients with chronic benzodiazepine use - may precipitate seizures.".into(),
                monitoring: list(&[
                    "Level of consciousness",
                    "Respiratory rate",
                    "Seizure activity",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::HighAlert,
                    "Can precipitate seizures in patients with chronic benzodiazepine use or TCA overdose.",
                ),
                alert(
                    AlertLevel::Caution,
                    "Duration shorter than most benzodiazepines - sedation may return.",
                ),
            ],
            concentrations: list(&["0.1 mg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::C),
            onset_duration: onset("1-2 minutes", "45-90 minutes"),
            interactions: vec![],
            reversal: None,
        },
        // ====================================================================
        // Metabolic
        // ====================================================================
        Medication {
            id: "dextrose".into(),
            name: "Dextrose (D50W, D25W, D10W)".into(),
            generic_name: Some("Dextrose".into()),
            category: "Metabolic".into(),
            subcategory: Some("Glucose Solution".into()),
            description: "Concentrated glucose solution for treatment of hypoglycemia and altered mental status.".into(),
            indications: list(&[
                "Hypoglycemia",
                "Altered mental status with suspected hypoglycemia",
                "Diabetic emergencies",
            ]),
            contraindications: list(&["Intracranial hemorrhage", "Allergy to corn products"]),
            dosages: vec![
                dosage(
                    "Adult Hypoglycemia",
                    "25 g (50 mL of D50W) IV push, may repeat if no response in 10 minutes.",
                ),
                // 0.5-1 g/kg, expressed in mg; volume assumes D25W
                calculated(
                    "Pediatric Hypoglycemia",
                    "0.5-1 g/kg IV (2-4 mL/kg of D25W or 5-10 mL/kg of D10W).",
                    DosingRule::per_kg_range(500.0, 1000.0, Milligram)
                        .concentration(250.0, MgPerMl),
                ),
            ],
            administration: Administration {
                routes: list(&["IV", "IO"]),
                notes: "D50W is hyperosmolar and can cause tissue necrosis if extravasated. Use D25W or D10W in children.".into(),
                monitoring: list(&[
                    "Blood glucose",
                    "Mental status",
                    "IV site for extravasation",
                ]),
            },
            alerts: vec![
                alert(
                    AlertLevel::Caution,
                    "D50W can cause tissue necrosis if extravasated. Ensure good IV access.",
                ),
                alert(
                    AlertLevel::Info,
                    "May worsen neurologic outcome in stroke patients.",
                ),
            ],
            concentrations: list(&["D50W: 500 mg/mL", "D25W: 250 mg/mL", "D10W: 100 mg/mL"]),
            algorithms: vec![],
            look_alike_sound_alike: vec![],
            pregnancy_category: Some(PregnancyCategory::A),
            onset_duration: onset("1-3 minutes", "Variable"),
            interactions: vec![],
            reversal: None,
        },
    ]
}

// ============================================================================
// Protocols
// ============================================================================

fn node(id: &str, title: &str, content: &str, kind: NodeKind) -> ProtocolNode {
    ProtocolNode {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        clinical_notes: vec![],
        kind,
    }
}

fn start(next: &str) -> NodeKind {
    NodeKind::Start { next: next.into() }
}

fn action(next: &str) -> NodeKind {
    NodeKind::Action { next: next.into() }
}

fn give(medication_id: &str, next: &str) -> NodeKind {
    NodeKind::Medication {
        medication_id: medication_id.into(),
        next: next.into(),
    }
}

fn decide(options: &[(&str, &str)]) -> NodeKind {
    NodeKind::Decision {
        options: options
            .iter()
            .map(|(label, next)| DecisionOption {
                label: label.to_string(),
                next: next.to_string(),
            })
            .collect(),
    }
}

fn timer(duration_seconds: u32, next: &str) -> NodeKind {
    NodeKind::Timer {
        duration_seconds,
        next: next.into(),
    }
}

fn default_protocols() -> Vec<(ProtocolInfo, Vec<ProtocolNode>)> {
    vec![
        (
            ProtocolInfo {
                id: "acls-cardiac-arrest".into(),
                title: "ACLS: Cardiac Arrest".into(),
                category: ProtocolCategory::Acls,
                description: "Algorithm for adult patients in cardiac arrest (VF/pVT, Asystole/PEA).".into(),
            },
            acls_cardiac_arrest(),
        ),
        (
            ProtocolInfo {
                id: "pals-cardiac-arrest".into(),
                title: "PALS: Cardiac Arrest".into(),
                category: ProtocolCategory::Pals,
                description: "Algorithm for pediatric patients in cardiac arrest.".into(),
            },
            pals_cardiac_arrest(),
        ),
        (
            ProtocolInfo {
                id: "anaphylaxis".into(),
                title: "Anaphylaxis Management".into(),
                category: ProtocolCategory::General,
                description: "Protocol for managing severe allergic reactions.".into(),
            },
            anaphylaxis(),
        ),
    ]
}

fn acls_cardiac_arrest() -> Vec<ProtocolNode> {
    let mut cpr = node(
        "cpr",
        "Start High-Quality CPR",
        "Push hard (at least 2 inches/5 cm) and fast (100-120/min) and allow complete chest recoil. Give oxygen. Attach monitor/defibrillator.",
        action("rhythm-check"),
    );
    cpr.clinical_notes = list(&[
        "Minimize interruptions in compressions.",
        "Rotate compressors every 2 minutes.",
    ]);

    vec![
        node(
            "start",
            "Start: Patient in Cardiac Arrest",
            "Verify unresponsiveness, absence of breathing, and no pulse. Call for help and get AED/defibrillator.",
            start("cpr"),
        ),
        cpr,
        node(
            "rhythm-check",
            "Rhythm Shockable?",
            "Analyze rhythm on monitor.",
            decide(&[
                ("Yes (VF/pVT)", "shock"),
                ("No (Asystole/PEA)", "epi-asystole"),
            ]),
        ),
        node(
            "shock",
            "Shock",
            "Deliver shock as per device instructions. Immediately resume CPR after the shock.",
            action("cpr-cycle-2"),
        ),
        node(
            "epi-asystole",
            "Administer Epinephrine",
            "Give Epinephrine 1 mg IV/IO as soon as possible. Resume CPR immediately.",
            give("epinephrine", "cpr-cycle-2"),
        ),
        node(
            "cpr-cycle-2",
            "CPR Cycle (2 minutes)",
            "Continue high-quality CPR for 2 minutes.",
            timer(120, "rhythm-check-2"),
        ),
        node(
            "rhythm-check-2",
            "Rhythm Shockable?",
            "Analyze rhythm after 2 minutes of CPR.",
            decide(&[
                ("Yes (VF/pVT)", "shock-2"),
                ("No (Asystole/PEA)", "continue-cpr-no-shock"),
            ]),
        ),
        node(
            "shock-2",
            "Shock",
            "Deliver shock. Immediately resume CPR. Consider antiarrhythmics (e.g., Amiodarone).",
            action("end"),
        ),
        node(
            "continue-cpr-no-shock",
            "Continue CPR",
            "Resume CPR. Treat reversible causes. There is no shock indicated.",
            action("end"),
        ),
        node(
            "end",
            "Protocol Branch End",
            "This branch of the protocol has ended. Continue management as per patient status and further guidelines.",
            NodeKind::End,
        ),
    ]
}

fn pals_cardiac_arrest() -> Vec<ProtocolNode> {
    vec![
        node(
            "start",
            "Start: Pediatric Patient in Cardiac Arrest",
            "Verify unresponsiveness, absence of breathing. Activate emergency response, get AED/defibrillator.",
            start("cpr"),
        ),
        node(
            "cpr",
            "Start High-Quality CPR",
            "Provide compressions and ventilations (15:2 with 2 rescuers). Give oxygen. Attach monitor.",
            action("rhythm-check"),
        ),
        node(
            "rhythm-check",
            "Rhythm Shockable?",
            "Analyze patient's rhythm.",
            decide(&[("Yes (VF/pVT)", "shock"), ("No (Asystole/PEA)", "epi")]),
        ),
        node(
            "shock",
            "Deliver Shock (2 J/kg)",
            "Deliver first shock at 2 J/kg. Immediately resume CPR after the shock.",
            action("cpr-cycle"),
        ),
        node(
            "epi",
            "Administer Epinephrine",
            "Give Epinephrine 0.01 mg/kg IV/IO. Repeat every 3-5 minutes. Resume CPR immediately.",
            give("epinephrine", "cpr-cycle"),
        ),
        node(
            "cpr-cycle",
            "CPR Cycle (2 minutes)",
            "Continue high-quality CPR for 2 minutes.",
            timer(120, "rhythm-check-2"),
        ),
        node(
            "rhythm-check-2",
            "Rhythm Shockable?",
            "Analyze rhythm after 2 minutes of CPR.",
            decide(&[
                ("Yes (VF/pVT)", "shock-2"),
                ("No (Asystole/PEA)", "continue-cpr-no-shock"),
            ]),
        ),
        node(
            "shock-2",
            "Deliver Shock (4 J/kg)",
            "Deliver second shock at 4 J/kg. Immediately resume CPR. Administer Epinephrine and consider Amiodarone.",
            action("end"),
        ),
        node(
            "continue-cpr-no-shock",
            "Continue CPR",
            "Resume CPR. Administer Epinephrine every 3-5 mins. Treat reversible causes.",
            action("end"),
        ),
        node(
            "end",
            "Protocol Branch End",
            "This branch of the protocol has ended. Continue management based on patient status.",
            NodeKind::End,
        ),
    ]
}

fn anaphylaxis() -> Vec<ProtocolNode> {
    vec![
        node(
            "start",
            "Start: Suspected Anaphylaxis",
            "Patient showing signs of a severe allergic reaction (e.g., respiratory distress, hypotension, skin reactions).",
            start("epi-im"),
        ),
        node(
            "epi-im",
            "Administer Epinephrine IM",
            "Inject Epinephrine (1:1,000) into the anterolateral thigh. Adult: 0.3-0.5 mg. Pediatric: 0.01 mg/kg (max 0.3 mg).",
            give("epinephrine", "position-oxygen"),
        ),
        node(
            "position-oxygen",
            "Positioning and Oxygen",
            "Place patient in a supine position (or position of comfort if dyspneic). Elevate lower extremities. Administer high-flow oxygen.",
            action("reassess"),
        ),
        node(
            "reassess",
            "Reassess Patient",
            "Is the patient responding to treatment? (Improvement in breathing, blood pressure)",
            decide(&[
                ("Yes, Improving", "monitor"),
                ("No, or Worsening", "repeat-epi"),
            ]),
        ),
        node(
            "repeat-epi",
            "Repeat Epinephrine & Consider Adjuncts",
            "Repeat IM Epinephrine every 5-15 minutes. Establish IV/IO access and give IV fluids for hypotension. Consider adjunct therapies.",
            give("epinephrine", "end"),
        ),
        node(
            "monitor",
            "Monitor and Consider Adjuncts",
            "Continue to monitor vitals closely. Consider secondary medications like antihistamines (e.g., Diphenhydramine) and corticosteroids.",
            action("end"),
        ),
        node(
            "end",
            "Continue Monitoring & Transport",
            "Continue close monitoring for biphasic reaction. Transport to a definitive care facility.",
            NodeKind::End,
        ),
    ]
}

// ============================================================================
// Queries
// ============================================================================

fn sorted_by_name(mut meds: Vec<&Medication>) -> Vec<&Medication> {
    meds.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    meds
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Medication> {
        self.medications.get(id)
    }

    pub fn protocol(&self, id: &str) -> Option<&ProtocolDefinition> {
        self.protocols.get(id)
    }

    /// Every medication, ordered by name
    pub fn all_medications(&self) -> Vec<&Medication> {
        sorted_by_name(self.medications.values().collect())
    }

    /// Medications whose category matches exactly
    pub fn by_category(&self, category: &str) -> Vec<&Medication> {
        sorted_by_name(
            self.medications
                .values()
                .filter(|m| m.category == category)
                .collect(),
        )
    }

    /// Medications with an indication containing `indication` (case-insensitive)
    pub fn by_indication(&self, indication: &str) -> Vec<&Medication> {
        let needle = indication.to_lowercase();
        sorted_by_name(
            self.medications
                .values()
                .filter(|m| m.indications.iter().any(|i| i.to_lowercase().contains(&needle)))
                .collect(),
        )
    }

    pub fn high_alert(&self) -> Vec<&Medication> {
        sorted_by_name(
            self.medications
                .values()
                .filter(|m| m.is_high_alert())
                .collect(),
        )
    }

    pub fn categories(&self) -> Vec<String> {
        self.medications
            .values()
            .map(|m| m.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn subcategories(&self) -> Vec<String> {
        self.medications
            .values()
            .filter_map(|m| m.subcategory.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Case-insensitive search over name, generic name, category and
    /// indications. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Medication> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all_medications();
        }

        sorted_by_name(
            self.medications
                .values()
                .filter(|m| {
                    m.name.to_lowercase().contains(&needle)
                        || m
                            .generic_name
                            .as_deref()
                            .is_some_and(|g| g.to_lowercase().contains(&needle))
                        || m.category.to_lowercase().contains(&needle)
                        || m.indications.iter().any(|i| i.to_lowercase().contains(&needle))
                })
                .collect(),
        )
    }

    /// Listing metadata for every protocol, ACLS first
    pub fn protocol_infos(&self) -> Vec<&ProtocolInfo> {
        let mut infos: Vec<_> = self.protocols.values().map(|p| &p.info).collect();
        infos.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, med) in &self.medications {
            if id.is_empty() || med.id.is_empty() {
                errors.push("Medication has empty ID".to_string());
            }
            if id != &med.id {
                errors.push(format!(
                    "Medication key '{}' doesn't match medication.id '{}'",
                    id, med.id
                ));
            }
            if med.name.is_empty() {
                errors.push(format!("Medication '{}' has empty name", id));
            }

            for dosage in &med.dosages {
                if let Some(rule) = &dosage.rule {
                    validate_rule(id, &dosage.population, rule, &mut errors);
                }
            }
        }

        for (id, protocol) in &self.protocols {
            if id != &protocol.info.id {
                errors.push(format!(
                    "Protocol key '{}' doesn't match info.id '{}'",
                    id, protocol.info.id
                ));
            }
            if protocol.info.title.is_empty() {
                errors.push(format!("Protocol '{}' has empty title", id));
            }

            for node in protocol.graph.nodes() {
                for target in node.successors() {
                    if !protocol.graph.contains(target) {
                        errors.push(format!(
                            "Protocol '{}': node '{}' references unknown node '{}'",
                            id, node.id, target
                        ));
                    }
                }
            }

            for (node_id, medication_id) in protocol.graph.medication_references() {
                if !self.medications.contains_key(medication_id) {
                    errors.push(format!(
                        "Protocol '{}': node '{}' references non-existent medication '{}'",
                        id, node_id, medication_id
                    ));
                }
            }
        }

        errors
    }
}

fn validate_rule(med_id: &str, population: &str, rule: &DosingRule, errors: &mut Vec<String>) {
    let factors = match &rule.kind {
        DoseKind::PerWeightFixed { factor } => vec![*factor],
        DoseKind::PerWeightRange {
            min_factor,
            max_factor,
        } => {
            if min_factor > max_factor {
                errors.push(format!(
                    "Medication '{}' ({}): min factor {} > max factor {}",
                    med_id, population, min_factor, max_factor
                ));
            }
            vec![*min_factor, *max_factor]
        }
        DoseKind::Unsupported => vec![],
    };

    if factors.iter().any(|f| !f.is_finite() || *f < 0.0) {
        errors.push(format!(
            "Medication '{}' ({}): dose factors must be finite and non-negative",
            med_id, population
        ));
    }

    if let (Some(min), Some(max)) = (rule.min_absolute_dose, rule.max_absolute_dose) {
        if min > max {
            errors.push(format!(
                "Medication '{}' ({}): min absolute dose {} > max absolute dose {}",
                med_id, population, min, max
            ));
        }
    }

    if let Some(concentration) = &rule.concentration {
        if !(concentration.value.is_finite() && concentration.value > 0.0) {
            errors.push(format!(
                "Medication '{}' ({}): concentration must be positive (got {})",
                med_id, population, concentration.value
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.medications.len(), 14);
        assert_eq!(catalog.protocols.len(), 3);
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        let cached = get_default_catalog();
        assert_eq!(cached.medications.len(), build_default_catalog().medications.len());
    }

    #[test]
    fn test_by_category() {
        let catalog = build_default_catalog();
        let ids: Vec<_> = catalog
            .by_category("Cardiac")
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["adenosine", "amiodarone", "atropine", "epinephrine"]);
        assert!(catalog.by_category("cardiac").is_empty());
    }

    #[test]
    fn test_by_indication_case_insensitive() {
        let catalog = build_default_catalog();
        let ids: Vec<_> = catalog
            .by_indication("BRADYCARDIA")
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["atropine", "epinephrine"]);
    }

    #[test]
    fn test_high_alert_includes_black_box() {
        let catalog = build_default_catalog();
        let high: Vec<_> = catalog.high_alert().iter().map(|m| m.id.as_str()).collect();
        assert!(high.contains(&"amiodarone"));
        assert!(high.contains(&"fentanyl"));
        assert!(!high.contains(&"adenosine"));
    }

    #[test]
    fn test_categories_sorted_and_unique() {
        let catalog = build_default_catalog();
        assert_eq!(
            catalog.categories(),
            vec![
                "Antidotes",
                "Cardiac",
                "Metabolic",
                "Neurological",
                "Pain Management",
                "Respiratory",
                "Sedation"
            ]
        );
        let subs = catalog.subcategories();
        assert_eq!(subs.iter().filter(|s| *s == "Opioid Analgesic").count(), 1);
    }

    #[test]
    fn test_search() {
        let catalog = build_default_catalog();

        let by_generic: Vec<_> = catalog.search("salbut").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(by_generic, vec!["albuterol"]);

        let by_indication: Vec<_> = catalog
            .search("opioid overdose")
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(by_indication, vec!["naloxone"]);

        assert_eq!(catalog.search("  ").len(), catalog.medications.len());
        assert!(catalog.search("zzz").is_empty());
    }

    #[test]
    fn test_protocol_infos_order() {
        let catalog = build_default_catalog();
        let ids: Vec<_> = catalog.protocol_infos().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["acls-cardiac-arrest", "pals-cardiac-arrest", "anaphylaxis"]);
    }

    #[test]
    fn test_protocol_medications_exist() {
        let catalog = build_default_catalog();
        for protocol in catalog.protocols.values() {
            for (_, med_id) in protocol.graph.medication_references() {
                assert!(catalog.get(med_id).is_some(), "missing {}", med_id);
            }
        }
    }

    #[test]
    fn test_validate_reports_bad_rules() {
        let mut catalog = build_default_catalog();
        let med = catalog.medications.get_mut("morphine").unwrap();
        med.dosages[1].rule = Some(
            DosingRule::per_kg_range(0.3, 0.1, DoseUnit::Milligram)
                .min_dose(5.0)
                .max_dose(1.0)
                .concentration(0.0, ConcentrationUnit::MgPerMl),
        );

        let errors = catalog.validate();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("min factor 0.3 > max factor 0.1")));
        assert!(errors.iter().any(|e| e.contains("min absolute dose 5 > max absolute dose 1")));
        assert!(errors.iter().any(|e| e.contains("concentration must be positive")));
    }

    #[test]
    fn test_validate_reports_unknown_protocol_medication() {
        let mut catalog = build_default_catalog();
        catalog.medications.remove("epinephrine");

        let errors = catalog.validate();
        assert!(errors
            .iter()
            .any(|e| e.contains("'acls-cardiac-arrest'") && e.contains("'epinephrine'")));
    }

    #[test]
    fn test_validate_key_mismatch() {
        let mut catalog = build_default_catalog();
        let mut med = catalog.medications["atropine"].clone();
        med.id = "other".into();
        catalog.medications.insert("atropine".into(), med);

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("doesn't match")));
    }
}
