use clap::Parser;
use lapak::cli::{
    Args, Command, handle_login, handle_logout, handle_status, handle_visit, init_logging,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let result = match &args.command {
        Command::Login { email, role, name } => handle_login(&args, email, role, name.as_deref()),
        Command::Status => handle_status(&args).await,
        Command::Visit {
            path,
            guard,
            redirect_to,
        } => handle_visit(&args, path, *guard, redirect_to.as_deref()).await,
        Command::Logout => handle_logout(&args),
    };

    if result.is_none() {
        std::process::exit(1);
    }
}
