use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mood_worker::Args::parse();

	mood_worker::run(args).await
}
