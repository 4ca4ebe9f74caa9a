use crate::renderer::RasterImage;
use crate::scheduler::RenderResult;

/// What [`Compositor::apply`] did with a result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Now displayed.
    Swapped,
    /// Older than what is displayed, dropped.
    Stale,
    /// The render failed. What was displayed stays.
    Failed,
}

#[derive(Default)]
struct Displayed {
    image: Option<RasterImage>,
    /// Highest epoch applied, even if its render failed.
    epoch: Option<u64>,
}

/// The images a host currently shows, one per page, and the epochs they came from.
///
/// Results may arrive in any order. The last epoch wins: once an epoch has been applied to a page,
/// results from earlier epochs are dropped.
#[derive(Default)]
pub struct Compositor {
    pages: hashbrown::HashMap<usize, Displayed>,
}
impl Compositor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn apply(&mut self, result: RenderResult) -> Applied {
        let RenderResult {
            outcome,
            page_index,
            epoch,
            job,
        } = result;
        let shown = self.pages.entry(page_index).or_default();
        if shown.epoch.is_some_and(|current| epoch < current) {
            log::trace!(
                "Dropping {} for page {page_index}, epoch {epoch} is behind {:?}",
                job.id,
                shown.epoch
            );
            return Applied::Stale;
        }
        shown.epoch = Some(epoch);
        match outcome {
            Ok(image) => {
                shown.image = Some(image);
                Applied::Swapped
            }
            Err(err) => {
                log::debug!("Keeping previous image of page {page_index}: {err}");
                Applied::Failed
            }
        }
    }
    #[must_use]
    pub fn image(&self, page_index: usize) -> Option<&RasterImage> {
        self.pages.get(&page_index)?.image.as_ref()
    }
    /// Highest epoch applied to this page.
    #[must_use]
    pub fn epoch(&self, page_index: usize) -> Option<u64> {
        self.pages.get(&page_index)?.epoch
    }
    /// Forget pages at or past `page_count`, after the document shrank.
    pub fn truncate(&mut self, page_count: usize) {
        self.pages.retain(|&page, _| page < page_count);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::RenderError;
    use crate::scheduler::{JobHandle, JobID};

    fn result(page_index: usize, epoch: u64, width: Option<u32>) -> RenderResult {
        let job = JobHandle {
            id: JobID::next(),
            epoch,
            page_index,
        };
        RenderResult {
            outcome: width
                .and_then(|w| RasterImage::transparent(w, 1, 1.0))
                .ok_or(RenderError::PageOutOfRange {
                    index: page_index,
                    count: 0,
                }),
            page_index,
            epoch,
            job,
        }
    }

    #[test]
    fn newer_epoch_finishing_first_wins() {
        let mut compositor = Compositor::new();
        assert_eq!(compositor.apply(result(0, 2, Some(20))), Applied::Swapped);
        assert_eq!(compositor.apply(result(0, 1, Some(10))), Applied::Stale);
        assert_eq!(compositor.image(0).map(RasterImage::width), Some(20));
        assert_eq!(compositor.epoch(0), Some(2));
        // Same epoch is a fresh render of the same scene, take it.
        assert_eq!(compositor.apply(result(0, 2, Some(30))), Applied::Swapped);
        assert_eq!(compositor.image(0).map(RasterImage::width), Some(30));
    }
    #[test]
    fn failure_keeps_image() {
        let mut compositor = Compositor::new();
        compositor.apply(result(1, 1, Some(5)));
        assert_eq!(compositor.apply(result(1, 3, None)), Applied::Failed);
        assert_eq!(compositor.image(1).map(RasterImage::width), Some(5));
        // The failed epoch still outranks older results.
        assert_eq!(compositor.apply(result(1, 2, Some(7))), Applied::Stale);
        assert_eq!(compositor.epoch(1), Some(3));
    }
    #[test]
    fn pages_independent() {
        let mut compositor = Compositor::new();
        compositor.apply(result(0, 5, Some(1)));
        assert_eq!(compositor.apply(result(1, 0, Some(2))), Applied::Swapped);
        assert!(compositor.image(2).is_none());
        compositor.truncate(1);
        assert!(compositor.image(1).is_none());
        assert!(compositor.image(0).is_some());
    }
}
