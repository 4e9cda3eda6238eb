//! Prompt construction for rerank, answer and comparison calls

use crate::llm::ChatMessage;
use crate::store::RetrievedPassage;

/// Terminal reply when retrieval finds nothing
pub const NO_INFORMATION_MESSAGE: &str =
    "No se ha encontrado información relevante sobre tu consulta en la documentación disponible.";

/// Comparison value for insurers without evidence
pub const NOT_SPECIFIED: &str = "No especificado";

const UNKNOWN_INSURER: &str = "Desconocido";
const UNKNOWN_PAGE: &str = "?";

/// First `max_chars` characters of `text`, never splitting a character
pub fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn rerank_messages(
    question: &str,
    passages: &[RetrievedPassage],
    top_n: usize,
    snippet_chars: usize,
) -> Vec<ChatMessage> {
    let mut fragments = String::new();
    for (idx, passage) in passages.iter().enumerate() {
        fragments.push_str(&format!(
            "[{}] {}...\n",
            idx,
            snippet(&passage.text, snippet_chars)
        ));
    }

    let example: Vec<String> = (0..top_n.min(passages.len()))
        .rev()
        .map(|i| i.to_string())
        .collect();

    let prompt = format!(
        r#"Como experto en seguros, evalúa la relevancia de los siguientes fragmentos para responder a la pregunta: "{question}"

Devuelve ÚNICAMENTE los índices de los {top_n} fragmentos más útiles, separados por comas (ej: {example}).

Fragmentos:
{fragments}"#,
        question = question,
        top_n = top_n,
        example = example.join(","),
        fragments = fragments,
    );

    vec![ChatMessage::user(prompt)]
}

/// Labelled source blocks: `--- FUENTE: {insurer} (Pág {page}) ---`
pub fn format_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| {
            let insurer = if p.insurer.is_empty() {
                UNKNOWN_INSURER
            } else {
                p.insurer.as_str()
            };
            let page = p.page.as_deref().unwrap_or(UNKNOWN_PAGE);
            format!("--- FUENTE: {} (Pág {}) ---\n{}", insurer, page, p.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn answer_messages(question: &str, context: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Eres un asistente experto en seguros. Genera una respuesta estructurada basándote ÚNICAMENTE en el contexto proporcionado.

Usa el siguiente formato Markdown para tu respuesta:

### 📋 Resumen
(Una síntesis directa de la respuesta en 2-4 frases)

### 📝 Detalles
(Explicación completa utilizando viñetas para coberturas, condiciones o exclusiones)

### 📂 Fuentes Referenciadas
(Lista explícita de los documentos y páginas citados, ej: 'Rimac Vehicular (Pág 12)')

---
Contexto:
{context}

Pregunta: {question}"#,
        context = context,
        question = question,
    );

    vec![ChatMessage::user(prompt)]
}

/// One `--- CONTEXTO {INSURER} ---` block per insurer, in request order
pub fn comparison_context(blocks: &[(String, Vec<RetrievedPassage>)]) -> String {
    let mut context = String::new();
    for (insurer, passages) in blocks {
        let text = passages
            .iter()
            .map(|p| match p.page.as_deref() {
                Some(page) => format!("(Pág {}) {}", page, p.text),
                None => p.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        context.push_str(&format!("--- CONTEXTO {} ---\n{}\n\n", insurer, text));
    }
    context
}

pub fn comparison_messages(feature: &str, insurers: &[String], context: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Eres un experto en seguros. Tu tarea es extraer y comparar la característica '{feature}' para las siguientes aseguradoras basándote en su contexto: {insurers}.

{context}
Devuelve un JSON con este formato exacto:
{{
    "feature": "{feature}",
    "comparison": [
        {{
            "insurer": "NOMBRE_ASEGURADORA",
            "value": "Resumen del valor/condición (max 20 palabras)",
            "details": "Detalle técnico o cláusula completa",
            "source": "Referencia de página o documento"
        }}
    ]
}}

Incluye exactamente una entrada por aseguradora. Si no encuentras información para una aseguradora, pon "{not_specified}" en value."#,
        feature = feature,
        insurers = insurers.join(", "),
        context = context,
        not_specified = NOT_SPECIFIED,
    );

    vec![
        ChatMessage::system("Responde ÚNICAMENTE con JSON válido."),
        ChatMessage::user(prompt),
    ]
}
