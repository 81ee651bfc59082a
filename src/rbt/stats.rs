use std::{fmt, result};

#[allow(unused_imports)]
use crate::rbt::Index;
use crate::dict::{Depth, ToJson};

/// Statistic type, for the red-black tree [Index].
///
/// `blacks` and `depths` are populated only by a `validate` call,
/// plain `to_stats` leaves them None.
pub struct Stats {
    pub n_count: usize,
    pub n_free: usize,
    pub node_size: usize,
    pub blacks: Option<usize>,
    pub depths: Option<Depth>,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let b = self.blacks.as_ref().map_or(none.clone(), |x| x.to_string());
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        writeln!(
            f,
            "rbt = {{ n_count={}, n_free={}, node_size={}, blacks={} }}",
            self.n_count, self.n_free, self.node_size, b,
        )?;
        write!(f, "rbt.depths = {}", d)
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        let null = "null".to_string();
        format!(
            concat!(
                r#"{{ "rbt": {{ "n_count": {}, "n_free": {}, "#,
                r#""node_size": {}, "blacks": {}, "depths": {} }} }}"#,
            ),
            self.n_count,
            self.n_free,
            self.node_size,
            self.blacks.as_ref().map_or(null.clone(), |x| format!("{}", x)),
            self.depths.as_ref().map_or(null, |x| x.to_json()),
        )
    }
}
