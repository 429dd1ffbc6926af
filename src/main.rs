use clap::Parser;

use shortstat::cli::{Cli, Commands, ConfigCommands, config_generate};
use shortstat::config::{get_config, init_config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        }) => {
            // 生成配置不需要日志和存储
            if let Err(e) = config_generate(output_path, force) {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Serve) | None => {
            init_config(cli.config.as_deref());
            let config = get_config();
            let _guard = shortstat::system::init_logging(&config.logging);

            shortstat::runtime::modes::run_server(&config).await
        }
    }
}
