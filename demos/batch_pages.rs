use page_stream::{partition, run_over_pages_async, CancelToken, SliceExt, TaskRunner};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Record {
    id: u32,
    payload: String,
}

fn records(len: u32) -> Vec<Record> {
    (0..len)
        .map(|id| Record {
            id,
            payload: if id % 997 == 0 && id > 0 {
                String::new()
            } else {
                format!("record-{}", id)
            },
        })
        .collect()
}

fn validate(page: &[Record]) -> Result<(), String> {
    match page.iter().find(|record| record.payload.is_empty()) {
        Some(record) => Err(format!("record {} has no payload", record.id)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let rows = records(10_000);

    // validate pages on threads, every failed page is reported
    let instant = Instant::now();
    let runner = TaskRunner::parallel(4);
    match runner.run(partition(&rows, 500).into_vec(), |_, page| validate(page)) {
        Ok(()) => eprintln!("all pages valid"),
        Err(joined) => eprintln!("{}", joined),
    }
    eprintln!("threaded validation:\t{:?}", instant.elapsed());

    // stop dispatching pages after the first failure
    let token = CancelToken::new();
    let runner = TaskRunner::parallel(1).with_cancel_token(token.clone());
    let result = runner.run(rows.pages_by_division(Some(8)).into_vec(), |index, page| {
        validate(page).map_err(|err| {
            token.cancel();
            format!("page {}: {}", index, err)
        })
    });
    if let Err(joined) = result {
        let cancelled = joined.errors().iter().filter(|err| err.is_cancelled()).count();
        eprintln!("{} failed, {} cancelled", joined.len() - cancelled, cancelled);
    }

    // upload pages asynchronously, two at a time
    let instant = Instant::now();
    let pages: Vec<Vec<Record>> = partition(&rows, 2_000)
        .iter()
        .map(|page| page.to_vec())
        .collect();
    let result = run_over_pages_async(pages, 2, |index, page| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        eprintln!("uploaded page {} with {} records", index, page.len());
        Ok::<_, String>(())
    })
    .await;
    eprintln!("async upload:\t{:?} {:?}", instant.elapsed(), result.is_ok());
}
