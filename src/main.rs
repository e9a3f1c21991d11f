use issue_tracker::{AppError, run};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        let code = e.downcast_ref::<AppError>().map_or(1, AppError::exit_code);
        std::process::exit(code);
    }
}
