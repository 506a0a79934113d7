//! Window extraction

use comms_if::msg::Waypoint;

/// Return up to `count` consecutive waypoints starting at `start`.
///
/// Unlike localisation the window never wraps around the end of the path, close to the end it is
/// simply shorter. A `start` beyond the end gives an empty window.
pub fn extract(waypoints: &[Waypoint], start: usize, count: usize) -> &[Waypoint] {
    let len = waypoints.len();
    let begin = start.min(len);
    let end = start.saturating_add(count).min(len);

    &waypoints[begin..end]
}

#[cfg(test)]
mod test {
    use super::*;

    fn waypoints(n: usize) -> Vec<Waypoint> {
        (0..n).map(|i| Waypoint::new(i as f64, 0.0, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_full_window() {
        let wps = waypoints(300);
        let win = extract(&wps, 10, 200);

        assert_eq!(win.len(), 200);
        assert_eq!(win[0], wps[10]);
        assert_eq!(win[199], wps[209]);
    }

    #[test]
    fn test_no_wraparound() {
        let wps = waypoints(10);
        let win = extract(&wps, 5, 200);

        assert_eq!(win.len(), 5);
        assert_eq!(win[0], wps[5]);
        assert_eq!(win[4], wps[9]);
    }

    #[test]
    fn test_out_of_range() {
        let wps = waypoints(10);
        assert!(extract(&wps, 10, 5).is_empty());
        assert!(extract(&wps, 50, 5).is_empty());
        assert_eq!(extract(&wps, 3, usize::MAX).len(), 7);
    }
}
