/// Formats an error and its whole chain of sources.
///
/// Used to implement `Debug` on the error enums of the services, so that a logged
/// `?error` shows every underlying cause and not only the outermost message:
///
/// ```text
/// Bulk ingestion aborted at batch 2, 1000 items were already committed
///
/// Caused by:
///         Error from the vector index: deadline has elapsed
/// ```
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;

    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
