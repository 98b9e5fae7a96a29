// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use snafu::{Snafu, ensure};

/// Erasure set sizes a deployment may be split into.
const SET_SIZES: std::ops::RangeInclusive<i64> = 4..=16;

/// Lowest parity offered to the user.
const MIN_PARITY: i64 = 2;

#[derive(Snafu, Debug, PartialEq)]
pub enum Error {
    #[snafu(display(
        "incorrect number of endpoints provided: {} nodes with {} drives each",
        nodes,
        disks_per_node
    ))]
    InvalidEndpoints { nodes: i64, disks_per_node: i64 },
}

/// Lists the erasure-code parities a pool of `nodes` servers with
/// `disks_per_node` drives each can be deployed with, highest first.
pub fn parity_values(nodes: i64, disks_per_node: i64) -> Result<Vec<String>, Error> {
    let set_size = erasure_set_size(nodes, disks_per_node)?;

    Ok((MIN_PARITY..=set_size / 2)
        .rev()
        .map(|parity| format!("EC:{}", parity))
        .collect())
}

/// Picks the largest set size that divides the drive count and is symmetric
/// with the server count.
fn erasure_set_size(nodes: i64, disks_per_node: i64) -> Result<i64, Error> {
    ensure!(
        nodes > 0 && disks_per_node > 0,
        InvalidEndpointsSnafu {
            nodes,
            disks_per_node
        }
    );

    let drives = nodes
        .checked_mul(disks_per_node)
        .ok_or(Error::InvalidEndpoints {
            nodes,
            disks_per_node,
        })?;
    SET_SIZES
        .filter(|size| drives % size == 0)
        .filter(|size| {
            if nodes > *size {
                nodes % size == 0
            } else {
                size % nodes == 0
            }
        })
        .max()
        .ok_or(Error::InvalidEndpoints {
            nodes,
            disks_per_node,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_values() {
        assert_eq!(
            parity_values(4, 10),
            Ok(vec!["EC:4".to_string(), "EC:3".to_string(), "EC:2".to_string()])
        );
        assert_eq!(parity_values(4, 1), Ok(vec!["EC:2".to_string()]));
        assert_eq!(
            parity_values(2, 50),
            Ok(vec![
                "EC:5".to_string(),
                "EC:4".to_string(),
                "EC:3".to_string(),
                "EC:2".to_string()
            ])
        );
    }

    #[test]
    fn test_parity_values_rejects_small_deployments() {
        assert!(parity_values(1, 1).is_err());
        assert!(parity_values(0, 8).is_err());
        assert!(parity_values(3, -1).is_err());
    }

    #[test]
    fn test_parity_values_rejects_overflowing_drive_count() {
        assert_eq!(
            parity_values(i64::MAX, 2),
            Err(Error::InvalidEndpoints {
                nodes: i64::MAX,
                disks_per_node: 2
            })
        );
        assert!(parity_values(2, i64::MAX).is_err());
    }

    #[test]
    fn test_erasure_set_size_prefers_largest_symmetric_set() {
        assert_eq!(erasure_set_size(16, 1), Ok(16));
        assert_eq!(erasure_set_size(4, 4), Ok(16));
        assert_eq!(erasure_set_size(4, 10), Ok(8));
    }
}
