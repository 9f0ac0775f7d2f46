//! Wildcard hostname matching against certificate common names.
//!
//! No RFC pins down wildcard matching precisely; RFC 2818 gives only broad
//! guidance and practice varies between implementations. The rules here are:
//! `*` is the only wildcard character and matches any substring within a
//! single dot-separated label, labels are compared pairwise from the right,
//! the hostname and the common name must have the same number of labels, and
//! a common name of exactly `*` matches any non-empty hostname. One trailing
//! dot is tolerated on either side.

/// Matches `hostname` against a certificate common name, label by label from
/// the right.
pub fn hostname_wildcard_match(hostname: &str, common_name: &str) -> bool {
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);
    let common_name = common_name.strip_suffix('.').unwrap_or(common_name);

    // A common name of just "*" covers every hostname, at any depth.
    if common_name == "*" {
        return !hostname.is_empty();
    }

    let mut hostname_labels = hostname.rsplit('.');
    let mut cn_labels = common_name.rsplit('.');
    loop {
        match (hostname_labels.next(), cn_labels.next()) {
            (Some(hostname_label), Some(cn_label)) => {
                if !subdomain_wildcard_match(hostname_label, cn_label) {
                    return false;
                }
            }
            (None, None) => return true,
            // A wildcard label covers exactly one hostname label, so
            // differing label counts never match.
            _ => return false,
        }
    }
}

/// Matches a single hostname label against a single common name label.
///
/// The wildcard label splits at its first `*` into a literal prefix and a
/// remainder. The prefix must match literally; the remainder is then searched
/// for at each position of the rest of the subdomain, recursing so that a
/// label like `test*foo*bar` matches `testfoofoobar` by consuming `test`,
/// then trying `foo*bar` against `foofoobar` and `foobar` in turn. On failure
/// of the recursive tail the search resumes one position further right.
fn subdomain_wildcard_match(subdomain: &str, wildcard: &str) -> bool {
    let wildcard_pos = match wildcard.find('*') {
        Some(wildcard_pos) => wildcard_pos,
        None => return subdomain == wildcard,
    };

    // The part of the subdomain before the wildcard must match literally.
    if subdomain.get(..wildcard_pos) != Some(&wildcard[..wildcard_pos]) {
        return false;
    }

    let new_wildcard = &wildcard[wildcard_pos + 1..];
    if new_wildcard.is_empty() {
        // Nothing after the *, so the rest of the subdomain is covered.
        return true;
    }

    // The literal run between this * and the next must occur somewhere in
    // the remaining subdomain; try each occurrence in order.
    let match_str = match new_wildcard.find('*') {
        Some(next_pos) => &new_wildcard[..next_pos],
        None => new_wildcard,
    };

    let mut new_subdomain = &subdomain[wildcard_pos..];
    let mut sub_pos = new_subdomain.find(match_str);
    while let Some(pos) = sub_pos {
        new_subdomain = &new_subdomain[pos..];
        if subdomain_wildcard_match(new_subdomain, new_wildcard) {
            return true;
        }
        sub_pos = match new_subdomain.get(1..) {
            Some(rest) => rest.find(match_str).map(|found| found + 1),
            None => None,
        };
    }
    false
}
