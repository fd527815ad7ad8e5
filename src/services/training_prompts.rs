//! Prompt construction and transcript heuristics for the sales roleplay.

use crate::models::training::{Sender, TrainingEvaluation, TrainingMessage};
use crate::services::llm_service::ChatMessage;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductCategory {
    Plan,
    Internet,
    Tv,
    Combo,
    Mobile,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Plan,
        ProductCategory::Internet,
        ProductCategory::Tv,
        ProductCategory::Combo,
        ProductCategory::Mobile,
    ];

    fn pattern(&self) -> &'static str {
        match self {
            ProductCategory::Plan => r"\bplan(es)?\b",
            ProductCategory::Internet => r"\b(internet|fibra|wifi|wi-fi|megas)\b",
            ProductCategory::Tv => r"\b(tv|television|cable|canales)\b",
            ProductCategory::Combo => r"\b(combos?|paquetes?|triple)\b",
            ProductCategory::Mobile => r"\b(movil|moviles|celular|celulares|lineas?|datos)\b",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Plan => "planes",
            ProductCategory::Internet => "internet / fibra",
            ProductCategory::Tv => "televisión",
            ProductCategory::Combo => "combos o paquetes",
            ProductCategory::Mobile => "telefonía móvil",
        }
    }
}

fn category_regexes() -> &'static [(ProductCategory, Regex)] {
    static REGEXES: OnceLock<Vec<(ProductCategory, Regex)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        ProductCategory::ALL
            .iter()
            .map(|c| (*c, Regex::new(c.pattern()).expect("valid product pattern")))
            .collect()
    })
}

/// Lowercases and strips Spanish diacritics so keyword patterns stay ASCII.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// Product categories mentioned in any candidate turn, in declaration order.
pub fn detect_products(transcript: &[TrainingMessage]) -> Vec<ProductCategory> {
    let mut found = BTreeSet::new();
    for msg in transcript.iter().filter(|m| m.sender == Sender::Candidate) {
        let folded = fold_accents(&msg.content);
        for (category, re) in category_regexes() {
            if re.is_match(&folded) {
                found.insert(*category);
            }
        }
    }
    found.into_iter().collect()
}

const ROLEPLAY_RULES: &str = "Eres un cliente potencial escéptico que recibe el contacto de un asesor comercial de telecomunicaciones.
Reglas:
- Nunca reveles que eres una IA ni que esto es una simulación o un entrenamiento.
- Responde de forma breve (una a tres frases), como una persona real.
- Plantea objeciones realistas: precio, permanencia, cobertura, calidad del servicio o malas experiencias con otras compañías.
- No aceptes la oferta con facilidad; muestra interés solo si el asesor resuelve bien tus dudas.
- Responde siempre en español.";

const ASK_WHAT_IS_OFFERED: &str = "El asesor todavía no ha dicho qué ofrece. Pregúntale directamente qué te quiere ofrecer antes de plantear objeciones.";

pub fn roleplay_system_prompt(products: &[ProductCategory], first_turn: bool) -> String {
    let mut prompt = String::from(ROLEPLAY_RULES);
    if !products.is_empty() {
        let labels: Vec<&str> = products.iter().map(|p| p.label()).collect();
        prompt.push_str("\n\nEl asesor ha mencionado: ");
        prompt.push_str(&labels.join(", "));
        prompt.push_str(". Centra tus preguntas y objeciones en esos productos.");
    } else if first_turn {
        prompt.push_str("\n\n");
        prompt.push_str(ASK_WHAT_IS_OFFERED);
    }
    prompt
}

/// Maps the stored transcript onto chat roles: ai turns are the assistant, candidate turns the user.
pub fn transcript_to_chat(system_prompt: String, transcript: &[TrainingMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(transcript.iter().map(|m| match m.sender {
        Sender::Ai => ChatMessage::assistant(m.content.clone()),
        Sender::Candidate => ChatMessage::user(m.content.clone()),
    }));
    messages
}

pub const EVALUATION_SYSTEM_PROMPT: &str = "Eres un formador experto en ventas de telecomunicaciones. Evalúa el desempeño del asesor (candidato) en la conversación con un cliente simulado.
Considera: apertura y presentación, claridad de la oferta, manejo de objeciones, escucha activa, cierre y tiempo de respuesta.
Responde en español usando exactamente este formato:
Puntuación global: N
Fortalezas: ...
Debilidades: ...
Consejos: ...
Donde N es un número entero entre 0 y 100.";

pub fn evaluation_user_prompt(transcript: &[TrainingMessage], avg_response_seconds: f64) -> String {
    let mut out = String::from("Conversación:\n");
    for msg in transcript {
        let speaker = match msg.sender {
            Sender::Candidate => "Asesor",
            Sender::Ai => "Cliente",
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(msg.content.trim());
        out.push('\n');
    }
    out.push_str(&format!(
        "\nTiempo medio de respuesta del asesor: {:.1} segundos.",
        avg_response_seconds
    ));
    out
}

pub const DEFAULT_PARSED_SCORE: i32 = 70;
pub const EMPTY_SESSION_SCORE: i32 = 50;
pub const FAILED_EVALUATION_SCORE: i32 = 60;

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)puntuaci[oó]n global:\s*\**\s*(\d{1,3})").expect("valid score pattern")
    })
}

/// Extracts `Puntuación global: N`, clamped to 100. `None` when the marker is absent.
pub fn parse_score(text: &str) -> Option<i32> {
    score_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .map(|n| n.clamp(0, 100))
}

/// Mean seconds between an ai turn and the candidate turn that answers it.
pub fn average_response_seconds(transcript: &[TrainingMessage]) -> f64 {
    let deltas: Vec<f64> = transcript
        .windows(2)
        .filter(|w| w[0].sender == Sender::Ai && w[1].sender == Sender::Candidate)
        .map(|w| {
            let ms = (w[1].created_at - w[0].created_at).num_milliseconds().max(0);
            ms as f64 / 1000.0
        })
        .collect();

    if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f64>() / deltas.len() as f64
    }
}

pub fn empty_session_evaluation() -> TrainingEvaluation {
    TrainingEvaluation {
        score: EMPTY_SESSION_SCORE,
        text: "No se registraron mensajes en la sesión, así que no es posible evaluar el desempeño. \
               Inicia la conversación presentando tu oferta para recibir una evaluación."
            .to_string(),
        avg_response_seconds: 0.0,
        candidate_turns: 0,
        fallback: true,
    }
}

pub fn failed_evaluation(avg_response_seconds: f64, candidate_turns: usize) -> TrainingEvaluation {
    TrainingEvaluation {
        score: FAILED_EVALUATION_SCORE,
        text: "No fue posible generar una evaluación detallada en este momento. \
               Buen trabajo completando la práctica: revisa la claridad de tu oferta \
               y cómo respondes a las objeciones del cliente."
            .to_string(),
        avg_response_seconds,
        candidate_turns,
        fallback: true,
    }
}
