use super::address::{preview_address, PreviewFrame};
use super::bio::{BioDraft, BioEdit};
use super::debounce::Debouncer;
use log::*;
use tokio::time::Duration;

/// Live preview of one bio while it is being edited
///
/// Edits land in the draft immediately; the preview address is only
/// recomputed once the draft has been left alone for the debounce delay.
#[derive(Debug)]
pub struct PreviewSession {
    base_url: String,
    draft: BioDraft,
    pending: Debouncer<BioDraft>,
    frame: PreviewFrame,
    recomputations: u64,
}

impl PreviewSession {
    pub fn new<S: Into<String>>(draft: BioDraft, base_url: S, delay: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            draft,
            pending: Debouncer::new(delay),
            frame: PreviewFrame::default(),
            recomputations: 0,
        }
    }

    pub fn draft(&self) -> &BioDraft {
        &self.draft
    }

    pub fn current_address(&self) -> Option<&str> {
        self.frame.current()
    }

    /// How often the address was computed so far
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Apply an edit and restart the debounce delay
    pub fn apply(&mut self, edit: BioEdit) {
        self.draft.apply(edit);
        self.pending.push(self.draft.clone());
    }

    /// Show the current draft right away, without waiting
    pub fn prime(&mut self) -> Option<String> {
        self.pending.cancel();
        let snapshot = self.draft.clone();
        self.commit(&snapshot)
    }

    /// Wait for the edits to settle, then return the new address if the
    /// frame had to move
    pub async fn settled(&mut self) -> Option<String> {
        let snapshot = self.pending.settled().await;
        self.commit(&snapshot)
    }

    fn commit(&mut self, snapshot: &BioDraft) -> Option<String> {
        self.recomputations += 1;
        match preview_address(&self.base_url, snapshot) {
            Ok(address) => {
                if self.frame.navigate(address.clone()) {
                    let frame = snapshot.device.frame();
                    trace!(
                        "Preview of {} moved to {} ({}x{})",
                        snapshot.username,
                        address,
                        frame.width,
                        frame.height
                    );
                    Some(address)
                } else {
                    None
                }
            }
            Err(err) => {
                error!("Could not encode preview of {}: {}", snapshot.username, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::bio::{BioProfile, DeviceMode};
    use tokio::time::{advance, timeout};

    const DELAY: Duration = Duration::from_millis(500);

    fn named(name: &str) -> BioEdit {
        BioEdit::Profile(BioProfile {
            display_name: Some(name.to_owned()),
            ..BioProfile::default()
        })
    }

    fn session() -> PreviewSession {
        PreviewSession::new(BioDraft::new("alice"), "https://app.example", DELAY)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_edits_recompute_once() {
        let mut session = session();
        session.apply(named("A"));
        advance(Duration::from_millis(300)).await;
        session.apply(named("Al"));
        advance(Duration::from_millis(300)).await;
        session.apply(named("Alice"));

        assert!(timeout(Duration::from_millis(499), session.settled())
            .await
            .is_err());
        assert_eq!(session.recomputations(), 0);

        let address = session.settled().await.unwrap();
        assert_eq!(session.recomputations(), 1);
        assert!(address.contains("displayName=Alice&"), "{}", address);
        assert_eq!(session.current_address(), Some(address.as_str()));

        // nothing else is pending afterwards
        assert!(timeout(Duration::from_secs(5), session.settled())
            .await
            .is_err());
        assert_eq!(session.recomputations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_address_does_not_navigate() {
        let mut session = session();
        session.apply(BioEdit::Device(DeviceMode::Desktop));
        assert!(session.settled().await.is_some());

        session.apply(BioEdit::Device(DeviceMode::Desktop));
        assert_eq!(session.settled().await, None);
        assert_eq!(session.recomputations(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prime_skips_the_delay() {
        let mut session = session();
        session.apply(named("Bo"));
        let address = session.prime().unwrap();
        assert!(address.contains("displayName=Bo"));
        assert!(!session.is_pending());
    }
}
