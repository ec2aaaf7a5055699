//! Parsing of collected HEAD response header lines.

/// Header fields the engine cares about.
#[derive(Debug, Default)]
pub(super) struct ProbedHeaders {
    pub content_length: Option<u64>,
    pub accept_ranges: bool,
    pub content_disposition: Option<String>,
}

/// Folds raw header lines into `ProbedHeaders`. With redirects the lines of
/// several responses arrive back to back; later values win, so the final
/// response is the one that counts.
pub(super) fn parse_headers(lines: &[String]) -> ProbedHeaders {
    let mut out = ProbedHeaders::default();

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-length") {
            if let Ok(n) = value.parse::<u64>() {
                out.content_length = Some(n);
            }
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            // Present and not "none" means byte ranges work.
            out.accept_ranges = !value.eq_ignore_ascii_case("none");
        } else if name.eq_ignore_ascii_case("content-disposition") {
            out.content_disposition = Some(value.to_string());
        }
    }

    out
}
