use std::process::ExitCode;

use gitferry::ui::output;

fn main() -> ExitCode {
    match gitferry::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&err);
            for cause in err.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
