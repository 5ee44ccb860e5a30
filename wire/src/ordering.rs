use std::cmp::Ordering;

use crate::messages::BlockMetaData;

/// Replica ordering within one block: ascending rank. Ranks are assigned
/// uniquely at placement time, so a tie means a corrupt record; the datanode
/// id breaks it deterministically.
pub fn replica_order(a: &BlockMetaData, b: &BlockMetaData) -> Ordering {
    a.replica_rank
        .cmp(&b.replica_rank)
        .then_with(|| a.data_node_id.cmp(&b.data_node_id))
}

#[cfg(test)]
mod test {
    use super::*;

    fn meta(rank: u32, data_node_id: &str) -> BlockMetaData {
        BlockMetaData {
            file_id: "a.txt".to_owned(),
            file_name: "a.txt".to_owned(),
            block_number: 1,
            data_node_id: data_node_id.to_owned(),
            replica_rank: rank,
            length: 0,
        }
    }

    #[test]
    fn primary_sorts_first() {
        let mut replicas = vec![meta(2, "dn-c"), meta(0, "dn-a"), meta(1, "dn-b")];
        replicas.sort_by(replica_order);
        let ranks: Vec<u32> = replicas.iter().map(|r| r.replica_rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn corrupt_rank_ties_fall_back_to_node_id() {
        let mut replicas = vec![meta(1, "dn-z"), meta(1, "dn-a")];
        replicas.sort_by(replica_order);
        assert_eq!(replicas[0].data_node_id, "dn-a");
        assert_eq!(replicas[1].data_node_id, "dn-z");
    }
}
