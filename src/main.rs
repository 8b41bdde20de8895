use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

mod config;
mod helpers;
mod openaiapi;
mod template;


use config::Settings;
use openaiapi::{CompletionClient, GenerationParams, DEFAULT_MODEL};

/// Generate engaging product content from a product record and a prompt template
#[derive(Parser)]
#[clap(after_help = "Examples:\n  contentagent --product-file data/sample_product.json --template-name description_prompt\n  contentagent --product-file data/sample_product.json --template-name seo_snippets --output-file outputs/seo_content.txt")]
struct Cli {
	/// Path to the input product JSON file ('-' reads stdin)
	#[clap(long, alias = "product_file")]
	product_file: PathBuf,
	/// Name of the prompt template file (without .txt extension)
	#[clap(long, alias = "template_name")]
	template_name: String,
	#[clap(long, default_value = "templates")]
	templates_dir: PathBuf,
	/// Optional: path to save the generated content
	#[clap(long, alias = "output_file")]
	output_file: Option<PathBuf>,
	/// Model to use (defaults to `model` in config.json, then gpt-3.5-turbo)
	#[clap(long)]
	model: Option<String>,
	/// Creativity level, 0.0 to 2.0
	#[clap(long, default_value = "0.7", value_parser = parse_temperature)]
	temperature: f64,
	#[clap(long, default_value = "500", value_parser = clap::value_parser!(u32).range(1..))]
	max_tokens: u32,
	/// write last_request.json and last_response.json to the working directory
	#[clap(long)]
	write_req_resp: bool,
	/// print the expanded prompt, do not perform an API call
	#[clap(long)]
	no_network: bool,
}

fn parse_temperature(s: &str) -> Result<f64, String> {
	let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
	if (0.0..=2.0).contains(&value) {
		Ok(value)
	} else {
		Err(format!("temperature must be between 0.0 and 2.0, got {}", value))
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	helpers::init_logging();
	let args = Cli::parse();

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("{}", err);
			ExitCode::FAILURE
		},
	}
}

async fn run(args: Cli) -> Result<(), Box<dyn Error>> {
	info!("Loading product data...");
	let product = helpers::load_product(&args.product_file)?;
	info!("Processing product: {}", helpers::product_name(&product));

	info!("Loading prompt template...");
	let template = helpers::load_template(&args.templates_dir, &args.template_name)?;

	let expansion = template::expand(&template, &product);
	if !expansion.is_complete() {
		warn!("{} placeholder(s) left empty: {}", expansion.unresolved.len(), expansion.unresolved.join(", "));
	}

	if args.no_network {
		println!("{}", expansion.text);
		return Ok(());
	}

	let settings = match Settings::from_env() {
		Ok(settings) => settings,
		Err(err) => {
			if let Some(hint) = err.hint() {
				eprintln!("{}", hint);
			}
			return Err(err.into());
		},
	};
	debug!(?settings, "resolved settings");

	let params = GenerationParams {
		model: args.model
			.or_else(|| settings.default_model.clone())
			.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
		temperature: args.temperature,
		max_tokens: args.max_tokens,
	};
	let mut client = CompletionClient::new(&settings);
	client.write_req_resp = args.write_req_resp;

	info!("Generating content using template '{}'...", args.template_name);
	let content = match client.complete(&expansion.text, &params).await {
		Ok(content) => content,
		Err(err) => {
			if let Some(hint) = err.hint() {
				eprintln!("Tip: {}", hint);
			}
			return Err(err.into());
		},
	};
	info!("Content generation completed!");

	let rule = "=".repeat(50);
	println!("{}", rule);
	println!("GENERATED CONTENT:");
	println!("{}", rule);
	println!("{}", content);
	println!("{}", rule);

	if let Some(output_file) = args.output_file.as_deref() {
		match helpers::save_output(output_file, &content) {
			Ok(()) => info!("Output saved to: {}", output_file.display()),
			Err(err) => warn!("Could not save to '{}': {}", output_file.display(), err),
		}
	}

	Ok(())
}
