pub mod run;
pub mod windows;

use crate::cli::Commands;

pub async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            exe,
            container,
            host_window,
            title,
            keywords,
            config,
            no_manual,
        } => {
            run::execute(run::RunOptions {
                exe,
                container,
                host_window,
                title,
                keywords,
                config,
                no_manual,
            })
            .await
        }
        Commands::Windows { json } => windows::execute(json),
    }
}
