//! Transport-chain delivery scenarios
//!
//! Exercises the coordinator against scripted mock transports: healthy and
//! failing direct channels, an accepting/rejecting host service, and a
//! recording presenter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use perle_printer::{
    Alignment, ChannelSource, CoordinatorConfig, CutMode, DeliveryCoordinator, DeviceChannel,
    Directive, Emphasis, HostPrintOptions, HostPrintService, PrintError, PrintJob, PrintResult,
    Symbology, TicketPresenter, TransportKind, cmd, encode,
};

/// Channel that records writes, optionally failing the first few
struct MockChannel {
    open: bool,
    fail_writes: usize,
    writes: Arc<Mutex<Vec<(Instant, Vec<u8>)>>>,
}

#[async_trait]
impl DeviceChannel for MockChannel {
    fn is_open(&self) -> bool {
        self.open
    }

    fn baud_rate(&self) -> u32 {
        9600
    }

    async fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            self.open = false;
            return Err(PrintError::Transmission("mock write failure".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((Instant::now(), data.to_vec()));
        Ok(())
    }

    async fn close(&mut self) -> PrintResult<()> {
        self.open = false;
        Ok(())
    }
}

/// Source handing out [`MockChannel`]s and counting acquisitions
#[derive(Default)]
struct MockSource {
    acquisitions: AtomicUsize,
    first_channel_failing_writes: usize,
    writes: Arc<Mutex<Vec<(Instant, Vec<u8>)>>>,
}

impl MockSource {
    fn failing_first(fail_writes: usize) -> Self {
        Self {
            first_channel_failing_writes: fail_writes,
            ..Self::default()
        }
    }

    fn written_buffers(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelSource for MockSource {
    async fn acquire(&self, _baud_rate: u32) -> PrintResult<Box<dyn DeviceChannel>> {
        let n = self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChannel {
            open: true,
            fail_writes: if n == 0 {
                self.first_channel_failing_writes
            } else {
                0
            },
            writes: Arc::clone(&self.writes),
        }))
    }
}

/// Source where device selection never succeeds
struct DecliningSource;

#[async_trait]
impl ChannelSource for DecliningSource {
    async fn acquire(&self, _baud_rate: u32) -> PrintResult<Box<dyn DeviceChannel>> {
        Err(PrintError::ChannelUnavailable(
            "operator declined device selection".to_string(),
        ))
    }
}

/// Host service that accepts or rejects every job
struct MockHost {
    accept: bool,
    submissions: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockHost {
    fn new(accept: bool) -> Self {
        Self {
            accept,
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl HostPrintService for MockHost {
    async fn submit(&self, data: &[u8], _options: &HostPrintOptions) -> PrintResult<()> {
        if !self.accept {
            return Err(PrintError::HostServiceUnavailable(
                "print job rejected".to_string(),
            ));
        }
        self.submissions.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}

/// Presenter that records tickets, or fails when the surface is gone
struct MockPresenter {
    fail: bool,
    tickets: Arc<Mutex<Vec<String>>>,
}

impl MockPresenter {
    fn new() -> Self {
        Self {
            fail: false,
            tickets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            tickets: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TicketPresenter for MockPresenter {
    async fn present(&self, ticket: &str) -> PrintResult<()> {
        if self.fail {
            return Err(PrintError::Presentation(
                "no display surface available".to_string(),
            ));
        }
        self.tickets.lock().unwrap().push(ticket.to_string());
        Ok(())
    }
}

/// The receipt tail every scenario prints
fn receipt_job(label: &str) -> PrintJob {
    PrintJob::from(vec![
        Directive::SetAlignment {
            align: Alignment::Center,
        },
        Directive::SetEmphasis {
            emphasis: Emphasis::Bold,
        },
        Directive::Literal {
            text: label.to_string(),
        },
        Directive::SetEmphasis {
            emphasis: Emphasis::Normal,
        },
        Directive::LineFeed { count: 2 },
        Directive::CutPaper {
            mode: CutMode::Full,
        },
    ])
}

fn expected_receipt_bytes(label: &str) -> Vec<u8> {
    let mut expected = Vec::new();
    expected.extend_from_slice(&cmd::INIT);
    expected.extend_from_slice(&cmd::CHARSET_USA);
    expected.extend_from_slice(&cmd::CODEPAGE_WPC1252);
    expected.extend_from_slice(&cmd::ALIGN_CENTER);
    expected.extend_from_slice(&cmd::BOLD_ON);
    expected.extend_from_slice(label.as_bytes());
    expected.extend_from_slice(&cmd::BOLD_OFF);
    expected.extend_from_slice(&[cmd::LF, cmd::LF]);
    expected.extend_from_slice(&cmd::CUT_FULL);
    expected
}

#[tokio::test]
async fn direct_channel_receives_exact_bytes() {
    let source = Arc::new(MockSource::default());
    let coordinator =
        DeliveryCoordinator::new(source.clone(), Arc::new(MockPresenter::new()));

    let outcome = coordinator
        .print(&receipt_job("TOTAL: 45.00 MAD"))
        .await
        .unwrap();

    assert_eq!(outcome.via, TransportKind::Direct);
    assert!(outcome.is_exact());
    assert_eq!(outcome.attempts.len(), 1);

    let writes = source.written_buffers();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], expected_receipt_bytes("TOTAL: 45.00 MAD"));
    assert!(writes[0].ends_with(&cmd::CUT_FULL));
}

#[tokio::test]
async fn failed_write_invalidates_channel_and_next_call_reacquires() {
    let source = Arc::new(MockSource::failing_first(1));
    let presenter = Arc::new(MockPresenter::new());
    let coordinator = DeliveryCoordinator::new(source.clone(), presenter.clone());

    // first call: the freshly acquired channel dies on write, job degrades
    let outcome = coordinator
        .print(&receipt_job("TOTAL: 45.00 MAD"))
        .await
        .unwrap();
    assert_eq!(outcome.via, TransportKind::ManualFallback);
    assert_eq!(source.acquisitions.load(Ordering::SeqCst), 1);

    // second call: the stale handle is gone, a new channel is acquired
    let outcome = coordinator
        .print(&receipt_job("TOTAL: 12.50 MAD"))
        .await
        .unwrap();
    assert_eq!(outcome.via, TransportKind::Direct);
    assert_eq!(source.acquisitions.load(Ordering::SeqCst), 2);
    assert_eq!(source.written_buffers().len(), 1);
}

#[tokio::test]
async fn exhausted_transports_present_sanitized_ticket() {
    let host = Arc::new(MockHost::new(false));
    let presenter = Arc::new(MockPresenter::new());
    let coordinator = DeliveryCoordinator::new(Arc::new(DecliningSource), presenter.clone())
        .with_host(host.clone());

    let outcome = coordinator
        .print(&receipt_job("TOTAL: 45.00 MAD"))
        .await
        .unwrap();

    assert_eq!(outcome.via, TransportKind::ManualFallback);
    assert_eq!(outcome.attempts.len(), 3);
    assert_eq!(outcome.attempts[0].transport, TransportKind::Direct);
    assert_eq!(outcome.attempts[1].transport, TransportKind::HostService);
    assert_eq!(outcome.attempts[2].transport, TransportKind::ManualFallback);

    let tickets = presenter.tickets.lock().unwrap();
    assert_eq!(tickets.len(), 1);
    assert!(tickets[0].contains("TOTAL: 45.00 MAD"));
    assert!(
        tickets[0].chars().all(|c| c == '\n' || !c.is_control()),
        "control bytes leaked into the manual ticket: {:?}",
        tickets[0]
    );
}

#[tokio::test]
async fn host_service_success_is_terminal() {
    let host = Arc::new(MockHost::new(true));
    let presenter = Arc::new(MockPresenter::new());
    let coordinator = DeliveryCoordinator::new(Arc::new(DecliningSource), presenter.clone())
        .with_host(host.clone());

    let job = receipt_job("TOTAL: 45.00 MAD");
    let outcome = coordinator.print(&job).await.unwrap();

    assert_eq!(outcome.via, TransportKind::HostService);
    assert!(!outcome.is_exact());

    // the host got the raw encoded buffer, the presenter got nothing
    let submissions = host.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0], encode(&job).unwrap().into_bytes());
    assert!(presenter.tickets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn staff_copy_waits_for_customer_copy() {
    let source = Arc::new(MockSource::default());
    let config = CoordinatorConfig {
        copy_delay: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    let coordinator = DeliveryCoordinator::new(source.clone(), Arc::new(MockPresenter::new()))
        .with_config(config);

    let customer = receipt_job("TICKET CLIENT");
    let staff = receipt_job("COPIE AGENT");
    let (first, second) = coordinator.print_pair(&customer, &staff).await.unwrap();

    assert_eq!(first.via, TransportKind::Direct);
    assert_eq!(second.via, TransportKind::Direct);

    let writes = source.writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].1, expected_receipt_bytes("TICKET CLIENT"));
    assert_eq!(writes[1].1, expected_receipt_bytes("COPIE AGENT"));

    let gap = writes[1].0.duration_since(writes[0].0);
    assert!(
        gap >= Duration::from_millis(50),
        "staff copy started after {:?}",
        gap
    );
}

#[tokio::test]
async fn customer_fallback_does_not_stop_staff_copy() {
    let presenter = Arc::new(MockPresenter::new());
    let config = CoordinatorConfig {
        copy_delay: Duration::from_millis(10),
        ..CoordinatorConfig::default()
    };
    let coordinator = DeliveryCoordinator::new(Arc::new(DecliningSource), presenter.clone())
        .with_config(config);

    let (first, second) = coordinator
        .print_pair(&receipt_job("TICKET CLIENT"), &receipt_job("COPIE AGENT"))
        .await
        .unwrap();

    assert_eq!(first.via, TransportKind::ManualFallback);
    assert_eq!(second.via, TransportKind::ManualFallback);

    let tickets = presenter.tickets.lock().unwrap();
    assert_eq!(tickets.len(), 2);
    assert!(tickets[0].contains("TICKET CLIENT"));
    assert!(tickets[1].contains("COPIE AGENT"));
}

#[tokio::test]
async fn all_tiers_dead_surfaces_presentation_error() {
    let coordinator = DeliveryCoordinator::new(
        Arc::new(DecliningSource),
        Arc::new(MockPresenter::failing()),
    )
    .with_host(Arc::new(MockHost::new(false)));

    let result = coordinator.print(&receipt_job("TOTAL: 45.00 MAD")).await;

    match result {
        Err(e @ PrintError::Presentation(_)) => {
            assert!(!e.operator_message().is_empty());
        }
        other => panic!("expected Presentation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn oversized_barcode_fails_before_any_transport_runs() {
    let source = Arc::new(MockSource::default());
    let presenter = Arc::new(MockPresenter::new());
    let coordinator = DeliveryCoordinator::new(source.clone(), presenter.clone());

    let job = PrintJob::from(vec![Directive::Barcode {
        payload: "X".repeat(256),
        symbology: Symbology::Code128,
    }]);

    assert!(matches!(
        coordinator.print(&job).await,
        Err(PrintError::PayloadTooLarge { len: 256 })
    ));
    assert_eq!(source.acquisitions.load(Ordering::SeqCst), 0);
    assert!(presenter.tickets.lock().unwrap().is_empty());
}
