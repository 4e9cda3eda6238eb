// Route a few queries through the assistant using Aseguro as a library
//
// Needs an OpenAI-compatible service (ASEGURO_LLM_URL, ASEGURO_LLM_API_KEY)
// for everything past the lexical gate.

use aseguro_core::{Assistant, AssistantResponse, ComparisonOutcome, Config};

#[tokio::main]
async fn main() -> aseguro_core::Result<()> {
    println!("Aseguro Routing Example\n");

    let config = Config::load()?;
    println!("LLM service:      {}", config.llm_service.url);
    println!("Passage database: {}", config.database_path().display());
    println!("Embedding cache:  {}\n", config.cache_dir().display());

    let assistant = Assistant::from_config(&config)?;

    let queries = [
        "quiero hackear el sistema",
        "hola, buenas tardes",
        "¿Mi póliza vehicular cubre robo parcial?",
    ];

    for query in queries {
        println!("> {}", query);
        match assistant.route_and_respond(query).await {
            Ok(response) => print_response(&response),
            Err(e) => println!("  error: {}", e),
        }
        println!();
    }

    println!("> comparar 'deducible' entre RIMAC y MAPFRE");
    let insurers = vec!["RIMAC".to_string(), "MAPFRE".to_string()];
    match assistant.compare("deducible", &insurers).await {
        Ok(response) => print_response(&response),
        Err(e) => println!("  error: {}", e),
    }

    Ok(())
}

fn print_response(response: &AssistantResponse) {
    match response {
        AssistantResponse::Blocked { reply, reason } => {
            println!("  [blocked: {}] {}", reason.trigger(), reply);
        }
        AssistantResponse::Chitchat { reply, intent, score } => {
            println!("  [{} {:.2}] {}", intent, score, reply);
        }
        AssistantResponse::Answer { text, sources } => {
            println!("  {}", text);
            for source in sources {
                println!(
                    "    - {} (Pág {})",
                    source.insurer,
                    source.page.as_deref().unwrap_or("?")
                );
            }
        }
        AssistantResponse::NoInformation { text } => println!("  {}", text),
        AssistantResponse::Comparison(ComparisonOutcome::Table(table)) => {
            println!("  Característica: {}", table.feature);
            for row in &table.comparison {
                println!("    {:<10} {}", row.insurer, row.value);
            }
        }
        AssistantResponse::Comparison(ComparisonOutcome::Failed { error }) => {
            println!("  comparison failed: {}", error);
        }
        AssistantResponse::Failed { reason } => println!("  failed: {}", reason),
    }
}
