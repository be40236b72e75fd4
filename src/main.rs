use anyhow::{bail, Context};
use clap::Parser;
use phoenix_common::{FailurePolicy, NameTable, PartitionKey};
use phoenix_r1::action::{Action, RestoreOptions};
use phoenix_r1::cli::{Cli, Commands, DriverTool};
use phoenix_r1::console::{self, print_record, print_status, ConsolePrompt};
use phoenix_r1::paths::AppPaths;
use phoenix_r1::session::{Session, SessionOptions};
use phoenix_r1::shell;

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let name_table = match &cli.name_table {
        Some(path) => NameTable::from_file(path)
            .with_context(|| format!("failed to read name table {}", path.display()))?,
        None => NameTable::default(),
    };
    let options = SessionOptions {
        firmware_dir: cli.firmware_dir.clone(),
        tool: cli.tool.clone(),
        name_table,
        vocabulary: cli.verbs.clone().into(),
    };

    let paths = AppPaths::from_current_exe().context("failed to locate the application folder")?;
    log::debug!("app dir: {}", paths.app_dir().display());
    let mut session = Session::open(paths, options);

    let (action, assume_yes) = match cli.command {
        Commands::Status { skip_vendor } => {
            print_status(&session, skip_vendor);
            return Ok(());
        }

        Commands::Shell => return shell::run(&mut session).await,

        Commands::Config {
            set_tool,
            set_firmware_dir,
            clear_tool,
            clear_firmware_dir,
            show,
        } => {
            let mut changed = false;
            if clear_tool || set_tool.is_some() {
                let record = session.choose_tool(set_tool.as_deref())?;
                print_record(&record);
                changed = true;
            }
            if clear_firmware_dir || set_firmware_dir.is_some() {
                let record = session.choose_firmware_dir(set_firmware_dir.as_deref())?;
                print_record(&record);
                changed = true;
            }
            if show || !changed {
                println!("⚙ {}", session.paths().config_path().display());
                println!("{}", serde_json::to_string_pretty(session.config())?);
            }
            return Ok(());
        }

        Commands::Flash { partition } => (Action::Flash(partition), false),

        Commands::Restore {
            wipe,
            skip_vendor,
            abort_on_failure,
            yes,
        } => {
            let options = RestoreOptions {
                skip_optional: skip_vendor,
                wipe,
                policy: if abort_on_failure {
                    FailurePolicy::Abort
                } else {
                    FailurePolicy::Continue
                },
            };
            println!("🔥 PhoenixR1 - One-Click Restore\n");
            for key in PartitionKey::ALL {
                if skip_vendor && key == PartitionKey::Vendor {
                    continue;
                }
                println!("  {}", console::firmware_line(&session, key));
            }
            println!();
            (Action::Restore(options), yes)
        }

        Commands::Reset => (Action::Reset, false),
        Commands::RebootBootloader => (Action::RebootBootloader, false),
        Commands::Wipe { yes } => (Action::WipeUserdata, yes),
        Commands::Drivers { target } => match target {
            DriverTool::Zadig => (Action::OpenZadig, false),
            DriverTool::DeviceManager => (Action::OpenDeviceManager, false),
        },
    };

    let id = action.id();
    let mut prompt = ConsolePrompt { assume_yes };
    let succeeded = console::execute(&mut session, action, &mut prompt)
        .await
        .with_context(|| format!("{} failed", id))?;

    if !succeeded {
        bail!("{} did not complete", id);
    }
    Ok(())
}
