use redcap_cli::render::frame_table;

use crate::commands::ReportRun;

pub fn print_summary(run: &ReportRun) {
    let window = &run.report.window;
    println!(
        "Reporting window: {} - {}",
        window.start().format("%Y-%m-%d %H:%M"),
        window.end().format("%Y-%m-%d %H:%M")
    );
    for (title, df) in run.report.tables() {
        println!();
        println!("{title} ({} rows)", df.height());
        println!("{}", frame_table(df));
    }
    if !run.exported.is_empty() {
        println!();
        println!("Exported {} tables:", run.exported.len());
        for path in &run.exported {
            println!("  {}", path.display());
        }
    }
}
