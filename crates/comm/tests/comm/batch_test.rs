use ddmd_comm::{
    receive_batches, run_local, BatchSender, BlockDataType, CommError, Communicator, Tag, MASTER,
};

#[test]
fn batches_reach_every_rank_in_order() {
    let results = run_local(4, |comm| -> Result<_, CommError> {
        if comm.is_master() {
            let mut sender = BatchSender::new(&comm, BlockDataType::Distribution, 7, 1 << 16);
            for i in 0..50usize {
                sender.push(i)?;
            }
            assert_eq!(sender.n_items(), 50);
            let n = sender.finish()?;
            Ok((n, (0..50).collect::<Vec<usize>>(), 0))
        } else {
            let mut items = Vec::new();
            let mut n_batches = 0;
            let n = receive_batches(&comm, MASTER, BlockDataType::Distribution, |batch: Vec<usize>| {
                assert!(batch.len() <= 7);
                n_batches += 1;
                items.extend(batch);
                Ok::<_, CommError>(())
            })?;
            Ok((n, items, n_batches))
        }
    })
    .unwrap();
    for (rank, result) in results.into_iter().enumerate() {
        let (n, items, n_batches) = result.unwrap();
        assert_eq!(n, 50);
        assert_eq!(items, (0..50).collect::<Vec<_>>());
        if rank != MASTER {
            // 7 full batches and one with the last item
            assert_eq!(n_batches, 8);
        }
    }
}

#[test]
fn empty_stream_only_sends_terminator() {
    let results = run_local(2, |comm| -> Result<usize, CommError> {
        if comm.is_master() {
            BatchSender::<u32>::new(&comm, BlockDataType::Distribution, 4, 1024).finish()
        } else {
            receive_batches(&comm, MASTER, BlockDataType::Distribution, |_batch: Vec<u32>| {
                Ok::<_, CommError>(())
            })
        }
    })
    .unwrap();
    assert_eq!(results[0].as_ref().unwrap(), &0);
    assert_eq!(results[1].as_ref().unwrap(), &0);
}

#[test]
fn full_batch_is_sent_without_waiting_for_more_items() {
    let results = run_local(2, |comm| -> Result<usize, CommError> {
        if comm.is_master() {
            let mut sender = BatchSender::new(&comm, BlockDataType::Distribution, 4, 1024);
            for i in 0..4u32 {
                sender.push(i)?;
            }
            assert_eq!(sender.n_pending(), 0);
            // The worker only answers once it holds the first batch.
            assert_eq!(comm.recv_bytes(1, Tag::Data)?, vec![4]);
            sender.finish()
        } else {
            receive_batches(&comm, MASTER, BlockDataType::Distribution, |batch: Vec<u32>| {
                assert_eq!(batch, vec![0, 1, 2, 3]);
                comm.send_bytes(MASTER, Tag::Data, vec![batch.len() as u8])
            })
        }
    })
    .unwrap();
    assert_eq!(results[0].as_ref().unwrap(), &4);
    assert_eq!(results[1].as_ref().unwrap(), &4);
}
