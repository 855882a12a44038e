use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mood_api::Args::parse();

	mood_api::run(args).await
}
