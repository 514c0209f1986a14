use pdf_esign::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => server::run().await,
        [command, user_id] if command == "token" => server::print_token(user_id),
        _ => {
            eprintln!("usage: pdf-esign [token <user_id>]");
            std::process::exit(2);
        }
    }
}
