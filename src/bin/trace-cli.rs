use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use serde_json::Value;

use pubsub_trace::trace::propagation::{build, parse, Traceparent};
use pubsub_trace::trace::{IdGenerator, RandomIdGenerator, TraceContext, TraceFlags};

#[derive(Parser)]
#[command(name = "trace-cli")]
#[command(about = "Debug CLI for traceparent values and the publish endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh root traceparent
    Generate {
        /// Clear the sampled flag
        #[arg(long)]
        unsampled: bool,
    },
    /// Decode a traceparent value
    Decode { value: String },
    /// Trigger publishes on a running service
    Publish {
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { unsampled } => {
            let generator = RandomIdGenerator::default();
            let flags = if unsampled {
                TraceFlags::NOT_SAMPLED
            } else {
                TraceFlags::SAMPLED
            };
            let ctx = TraceContext::new(generator.new_trace_id(), generator.new_span_id(), flags);
            println!("{}", build(&ctx));
        }
        Commands::Decode { value } => match parse(Some(value.as_str())) {
            Traceparent::Present(ctx) => {
                println!("trace_id: {}", ctx.trace_id());
                println!("span_id:  {}", ctx.span_id());
                println!("sampled:  {}", ctx.is_sampled());
            }
            Traceparent::Absent => println!("absent"),
            Traceparent::Malformed { raw, reason } => {
                eprintln!("malformed traceparent {:?}: {}", raw, reason);
                std::process::exit(1);
            }
        },
        Commands::Publish { count } => {
            let client = reqwest::Client::new();
            let url = format!("{}/publish", cli.url);
            let requests = (0..count).map(|_| client.get(&url).send());

            for result in join_all(requests).await {
                print_response(result?).await?;
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
