//! `slotwise view`.

use slotwise_engine::{Engine, ViewOptions};

use crate::cli::RangeArgs;
use crate::error::CliResult;

pub async fn run(
    engine: &Engine,
    range: &RangeArgs,
    free: bool,
    viewer: Option<String>,
) -> CliResult<()> {
    let window = range.window()?;
    let mut options = ViewOptions::default()
        .with_free(free)
        .with_external(range.external);
    if let Some(viewer) = viewer {
        options = options.with_viewer(viewer);
    }

    let view = engine
        .composer
        .compose(&range.resource, window, &options)
        .await?;
    print!("{}", view.render_agenda());
    Ok(())
}
