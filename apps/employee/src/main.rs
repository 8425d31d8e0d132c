use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    session::{load_session, load_token},
    FileSessionStore, HttpBillsGateway, IconEyeTarget, NewBillForm, Route, Router,
    SelectedFile, SubmitOutcome, TextRenderer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the bills list, optionally with a receipt preview open.
    Bills {
        #[arg(long)]
        preview: Option<String>,
    },
    /// Upload a receipt and submit a new bill.
    New {
        #[arg(long = "type")]
        expense_type: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        vat: String,
        #[arg(long, default_value = "")]
        pct: String,
        #[arg(long, default_value = "")]
        commentary: String,
        #[arg(long)]
        file: PathBuf,
    },
}

async fn print_document(router: &Router) {
    println!("{}", router.document().lock().await.to_markup());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(session_file) = cli.session_file {
        settings.session_file = session_file;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let store = FileSessionStore::open(&settings.session_file)?;
    let session = load_session(&store);
    let gateway = HttpBillsGateway::with_timeout(
        &settings.api_url,
        Duration::from_secs(settings.request_timeout_secs),
    )?
    .with_token(load_token(&store));
    info!(api_url = %settings.api_url, "employee: starting");

    let router = Router::new(session, Arc::new(gateway), Arc::new(TextRenderer));

    match cli.command {
        Command::Bills { preview } => {
            router.on_navigate(Route::Bills.path()).await;
            if let (Some(url), Some(controller)) = (preview, router.bills_controller().await) {
                controller
                    .handle_click_icon_eye(&IconEyeTarget::new(url))
                    .await;
            }
            print_document(&router).await;
        }
        Command::New {
            expense_type,
            name,
            amount,
            date,
            vat,
            pct,
            commentary,
            file,
        } => {
            router.on_navigate(Route::NewBill.path()).await;
            let Some(controller) = router.new_bill_controller().await else {
                print_document(&router).await;
                bail!("an employee session is required to submit a bill");
            };

            let bytes = fs::read(&file)
                .with_context(|| format!("failed to read receipt '{}'", file.display()))?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("receipt path '{}' has no file name", file.display()))?;
            let mut selected = SelectedFile::new(file_name, bytes);
            if let Some(mime) = mime_guess::from_path(&file).first() {
                selected = selected.with_mime_type(mime.essence_str());
            }
            controller.handle_change_file(selected).await;

            let outcome = controller
                .handle_submit(NewBillForm {
                    expense_type,
                    expense_name: name,
                    amount,
                    date,
                    vat,
                    pct,
                    commentary,
                })
                .await;
            print_document(&router).await;
            match outcome {
                SubmitOutcome::Submitted(bill) => info!("employee: bill '{}' submitted", bill.name),
                SubmitOutcome::Failed(message) => bail!("submission failed: {message}"),
                SubmitOutcome::Blocked(reason) => bail!("submission blocked: {reason}"),
            }
        }
    }

    Ok(())
}
