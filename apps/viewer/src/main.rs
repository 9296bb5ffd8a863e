use std::process::ExitCode;

fn main() -> ExitCode {
    lumen_viewer::internal_main()
}
