use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use multipart::{Headers, Multipart, MultipartError, Verdict};

const SIMPLE_CONTENT_TYPE: &str = "multipart/mixed; boundary=\"simple boundary\"";

const SIMPLE: &[u8] = b"This is the preamble.  It is to be ignored.\r\n\
    \r\n\
    --simple boundary\r\n\
    \r\n\
    This is implicitly typed plain ASCII text.\r\n\
    It does NOT end with a linebreak.\r\n\
    --simple boundary\r\n\
    Content-type: text/plain; charset=us-ascii\r\n\
    \r\n\
    This is explicitly typed plain ASCII text.\r\n\
    It DOES end with a linebreak.\r\n\
    \r\n\
    --simple boundary--\r\n\
    \r\n\
    This is the epilogue.  It is also to be ignored.\r\n";

fn chunked(
    payload: &[u8],
    size: usize,
) -> impl Stream<Item = Result<Bytes, MultipartError>> + Send + 'static {
    let chunks: Vec<_> = payload
        .chunks(size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    stream::iter(chunks)
}

async fn collect<S>(parts: S) -> Vec<(Headers, Bytes)>
where
    S: Stream<Item = Result<multipart::Part, MultipartError>>,
{
    futures::pin_mut!(parts);
    let mut collected = Vec::new();
    while let Some(part) = parts.next().await {
        let part = part.unwrap();
        let headers = part.headers().clone();
        collected.push((headers, part.bytes().await));
    }
    collected
}

#[tokio::test]
async fn parses_two_part_request() {
    for size in [SIMPLE.len(), 16, 1] {
        let multipart = Multipart::new(SIMPLE_CONTENT_TYPE, chunked(SIMPLE, size)).unwrap();
        let parts = collect(multipart.parts()).await;

        assert_eq!(parts.len(), 2, "chunk size {size}");
        assert!(parts[0].0.is_empty());
        assert_eq!(
            parts[0].1.as_ref(),
            b"This is implicitly typed plain ASCII text.\r\nIt does NOT end with a linebreak."
                .as_slice()
        );
        assert_eq!(
            parts[1].0.get("content-type"),
            Some("text/plain; charset=us-ascii")
        );
        assert_eq!(
            parts[1].1.as_ref(),
            b"This is explicitly typed plain ASCII text.\r\nIt DOES end with a linebreak.\r\n"
                .as_slice()
        );
    }
}

#[tokio::test]
async fn reads_disposition_split_across_chunks() {
    let payload = b"--09e1\r\n\
        Content-Disposition: form-data; name=\":action\"\r\n\
        \r\n\
        file_upload\r\n\
        --09e1--";
    let multipart =
        Multipart::new("multipart/form-data; boundary=09e1", chunked(payload, 4)).unwrap();
    let parts = collect(multipart.parts()).await;

    assert_eq!(parts.len(), 1);
    assert_eq!(
        parts[0].0.get("content-disposition"),
        Some("form-data; name=\":action\"")
    );
    assert_eq!(parts[0].1.as_ref(), b"file_upload".as_slice());
}

#[tokio::test]
async fn filter_skips_signed_parts() {
    let payload = b"--bnd\r\n\
        A: 1\r\n\
        \r\n\
        first\r\n\
        --bnd\r\n\
        X-Amz-Signature: deadbeef\r\n\
        \r\n\
        signature\r\n\
        --bnd\r\n\
        A: 3\r\n\
        \r\n\
        third\r\n\
        --bnd--";
    let multipart =
        Multipart::new("multipart/form-data; boundary=bnd", chunked(payload, 7)).unwrap();
    let parts =
        collect(multipart.filter(|headers| !headers.contains("x-amz-signature"))).await;

    let bodies: Vec<_> = parts.iter().map(|(_, body)| body.as_ref()).collect();
    assert_eq!(bodies, vec![b"first".as_slice(), b"third".as_slice()]);
}

#[tokio::test]
async fn inspect_accepts_matching_part() {
    let payload = b"--bnd\r\n\
        Test: 1\r\n\
        \r\n\
        data-1\r\n\
        --bnd\r\n\
        Test: 2\r\n\
        \r\n\
        data-2\r\n\
        --bnd\r\n\
        Test: 3\r\n\
        \r\n\
        data-3\r\n\
        --bnd--";
    let multipart =
        Multipart::new("multipart/mixed; boundary=bnd", chunked(payload, 11)).unwrap();
    let parts = collect(multipart.inspect(|headers| {
        let accept = headers.get("test") == Some("2");
        async move {
            if accept {
                Verdict::Accept
            } else {
                Verdict::Ignore
            }
        }
    }))
    .await;

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].1.as_ref(), b"data-2".as_slice());
}

#[tokio::test]
async fn dropped_part_is_skipped() {
    let payload = b"--bnd\r\n\
        A: 1\r\n\
        \r\n\
        a long first body that is never read\r\n\
        --bnd\r\n\
        A: 2\r\n\
        \r\n\
        second\r\n\
        --bnd--";
    let multipart =
        Multipart::new("multipart/mixed; boundary=bnd", chunked(payload, 9)).unwrap();
    let mut parts = multipart.parts();

    let first = parts.next().await.unwrap().unwrap();
    assert_eq!(first.headers().get("a"), Some("1"));
    drop(first);

    let second = parts.next().await.unwrap().unwrap();
    assert_eq!(second.headers().get("a"), Some("2"));
    assert_eq!(second.bytes().await.as_ref(), b"second".as_slice());
    assert!(parts.next().await.is_none());
}

#[tokio::test]
async fn empty_parts_are_kept() {
    let payload = b"--123\r\nFoo: bar\r\n\r\n\r\n--123--";
    let multipart =
        Multipart::new("multipart/mixed; boundary=123", chunked(payload, payload.len()))
            .unwrap();
    let parts = collect(multipart.parts()).await;

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].0.get("foo"), Some("bar"));
    assert!(parts[0].1.is_empty());
}

#[tokio::test]
async fn body_without_boundary_has_no_parts() {
    let multipart = Multipart::new(
        "multipart/mixed; boundary=bnd",
        chunked(b"no boundary anywhere", 5),
    )
    .unwrap();
    assert!(collect(multipart.parts()).await.is_empty());
}

#[tokio::test]
async fn missing_boundary_parameter_is_rejected() {
    let body = stream::empty::<Result<Bytes, MultipartError>>();
    let err = Multipart::new("multipart/mixed", body).unwrap_err();
    assert!(matches!(err, MultipartError::MissingBoundary));
}

#[tokio::test]
async fn unparsable_content_type_is_rejected() {
    let body = stream::empty::<Result<Bytes, MultipartError>>();
    let err = Multipart::new("not a content type", body).unwrap_err();
    assert!(matches!(err, MultipartError::InvalidContentType(_)));
}

#[tokio::test]
async fn upstream_error_is_forwarded() {
    let chunks = vec![
        Ok(Bytes::from_static(b"--bnd\r\nA: 1\r\n\r\nbody bytes before the failure")),
        Err(MultipartError::upstream("connection reset")),
    ];
    let multipart =
        Multipart::new("multipart/mixed; boundary=bnd", stream::iter(chunks)).unwrap();
    let mut parts = multipart.parts();

    let part = parts.next().await.unwrap().unwrap();
    assert_eq!(part.headers().get("a"), Some("1"));
    let body = part.bytes().await;
    assert!(body.starts_with(b"body bytes"));
    assert!(matches!(
        parts.next().await,
        Some(Err(MultipartError::Upstream(_)))
    ));
}
