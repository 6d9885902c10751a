/// Converts an effective bandwidth (bits per second) into a routing weight.
///
/// # Arguments
///
/// * `effective_bandwidth`: loss- and duplex-adjusted link rate
///
/// returns: f64
///
/// # Examples
///
/// ```
/// assert_eq!(warp::util::weight_from_bandwidth(2048.0), 1.0 / 2048.0);
/// assert!(warp::util::weight_from_bandwidth(0.0).is_infinite());
/// assert!(warp::util::weight_from_bandwidth(-1.0).is_infinite());
/// ```
pub fn weight_from_bandwidth(effective_bandwidth: f64) -> f64 {
    if effective_bandwidth <= 0.0 {
        f64::INFINITY
    } else {
        1.0 / effective_bandwidth
    }
}

/// Wire size in bytes of an LSA payload carrying `links` link records.
///
/// ```
/// assert_eq!(warp::util::lsa_payload_bytes(0), 8);
/// assert_eq!(warp::util::lsa_payload_bytes(3), 44);
/// ```
pub fn lsa_payload_bytes(links: usize) -> u64 {
    4 + 4 + 12 * links as u64
}
