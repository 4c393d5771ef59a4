//! Stage prompts.
//!
//! The three stages use fixed French prompts; each asks for one item per
//! line so the response can be split mechanically (see
//! [`crate::client::parse_item_list`]). Test cases are the exception:
//! the model answers with one markdown document per checkpoint.

pub const RULES_SYSTEM_PROMPT: &str = "\
Tu es un analyste métier. Tu extrais des règles de gestion précises et \
vérifiables à partir d'un cahier des charges. Réponds uniquement avec la \
liste des règles, une règle par ligne, sans commentaire.";

pub const CHECKPOINTS_SYSTEM_PROMPT: &str = "\
Tu es un ingénieur qualité. Tu transformes des exigences en points de \
contrôle vérifiables. Chaque point commence par « Vérifier que » ou \
« S'assurer que ». Réponds uniquement avec la liste des points, un point \
par ligne, sans commentaire.";

pub const TEST_CASES_SYSTEM_PROMPT: &str = "\
Tu es un testeur logiciel. Tu rédiges un cas de test complet (objectif, \
préconditions, étapes numérotées, résultat attendu) pour le point de \
contrôle fourni. Réponds en markdown.";

pub fn rules_user_prompt(chunk: &str) -> String {
    format!("Extrais les règles de gestion du texte suivant :\n\n{chunk}")
}

pub fn checkpoints_user_prompt(items: &[String]) -> String {
    format!(
        "Génère les points de contrôle pour les éléments suivants :\n\n{}",
        items.join("\n")
    )
}

pub fn test_cases_user_prompt(items: &[String]) -> String {
    format!(
        "Rédige le cas de test pour le point de contrôle suivant :\n\n{}",
        items.join("\n")
    )
}
