use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod helpers;
mod template;

/// Expand a prompt template against a product record without calling any API
#[derive(Parser)]
struct Cli {
	/// product JSON file ('-' reads stdin)
	product_file: PathBuf,
	/// template file to expand
	template_file: PathBuf,
	#[clap(long)]
	/// exit with an error when any placeholder is unresolved
	strict: bool,
}

fn main() -> ExitCode {
	helpers::init_logging();
	let args = Cli::parse();

	match run(&args) {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::from(2),
		Err(err) => {
			error!("{}", err);
			ExitCode::FAILURE
		},
	}
}

fn run(args: &Cli) -> Result<bool, Box<dyn Error>> {
	let product = helpers::load_product(&args.product_file)?;
	let template = fs::read_to_string(&args.template_file)?;

	let expansion = template::expand(&template, &product);
	println!("{}", expansion.text);

	eprintln!("--");
	for placeholder in template::placeholders(&template) {
		let state = if template::resolve(&product, placeholder.path).is_found() { "ok" } else { "missing" };
		eprintln!("{:>7}  {{{}}} at {}..{}", state, placeholder.path, placeholder.span.start, placeholder.span.end);
	}
	if !expansion.is_complete() {
		eprintln!("unresolved: {}", expansion.unresolved.join(", "));
	}

	Ok(expansion.is_complete() || !args.strict)
}
