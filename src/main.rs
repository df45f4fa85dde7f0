use clap::Parser;
use repo_insights::api::Error;
use repo_insights_app::report::AnalysisReport;
use repo_insights_app::Args;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let analysis = repo_insights_app::analyze(args).await?;

    println!("{}", AnalysisReport(&analysis));
    Ok(())
}
