//! Signed-document intake: render, locate the number, extract, decide
//!
//! Wires the host collaborators to the geometry and decision layers. The
//! pipeline holds no per-document state; every call stands alone.

use region_core::{
    classify_page_size_with, css_to_pdf_points, PageClassification, Region, RegionError,
    Template, TemplateRule, DEFAULT_TOLERANCE_PT,
};
use serde::Serialize;
use shared_types::{hash_document, CssRect, PageGeometry, PixelSize};
use tracing::{debug, info, warn};

use crate::config::IntakeConfig;
use crate::engine::{Decision, DecisionContext, DecisionEngine};
use crate::error::IntakeError;
use crate::events::IntakeEvent;
use crate::identity::normalize_issuer;
use crate::ledger::Ledger;
use crate::ports::{CandidateExtractor, Extraction, PageRenderer, TemplateStore};
use crate::review::ReviewStore;

/// Where the extraction region comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropSource {
    /// The issuer's stored template
    Template,
    /// A one-off crop drawn on a preview of `displayed` size
    Css { crop: CssRect, displayed: PixelSize },
    FullPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    Template,
    Crop,
    FullPage,
    /// Template requested, but the page is not a standard size
    NonStandardFallback,
}

/// One signed document to process
#[derive(Debug, Clone)]
pub struct DocumentRequest<'a> {
    pub document: &'a [u8],
    /// Raw issuer (sender address or platform name)
    pub issuer: &'a str,
    /// 1-based
    pub page_number: u32,
    pub crop: CropSource,
    pub signed_pdf_ref: Option<&'a str>,
}

impl<'a> DocumentRequest<'a> {
    pub fn new(document: &'a [u8], issuer: &'a str) -> Self {
        Self {
            document,
            issuer,
            page_number: 1,
            crop: CropSource::Template,
            signed_pdf_ref: None,
        }
    }

    pub fn with_crop(mut self, crop: CropSource) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }

    pub fn with_signed_pdf_ref(mut self, signed_pdf_ref: &'a str) -> Self {
        self.signed_pdf_ref = Some(signed_pdf_ref);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub classification: PageClassification,
    pub region: Region,
    pub region_source: RegionSource,
    pub extraction: Extraction,
    pub decision: Decision,
}

pub struct SignedDocumentPipeline<L, R> {
    engine: DecisionEngine<L, R>,
    renderer: Box<dyn PageRenderer>,
    extractor: Box<dyn CandidateExtractor>,
    templates: Box<dyn TemplateStore>,
    template_rules: Vec<TemplateRule>,
    tolerance_pt: f64,
    fallback_to_full_page: bool,
}

impl<L: Ledger, R: ReviewStore> SignedDocumentPipeline<L, R> {
    pub fn new(
        engine: DecisionEngine<L, R>,
        renderer: Box<dyn PageRenderer>,
        extractor: Box<dyn CandidateExtractor>,
        templates: Box<dyn TemplateStore>,
    ) -> Self {
        Self {
            engine,
            renderer,
            extractor,
            templates,
            template_rules: Vec::new(),
            tolerance_pt: DEFAULT_TOLERANCE_PT,
            fallback_to_full_page: true,
        }
    }

    /// Page tolerance, template rules and fallback policy from `config`
    pub fn with_config(mut self, config: &IntakeConfig) -> Self {
        self.template_rules = config.template_rules.clone();
        self.tolerance_pt = config.pages.tolerance_pt;
        self.fallback_to_full_page = config.pipeline.fallback_to_full_page;
        self
    }

    pub fn engine(&self) -> &DecisionEngine<L, R> {
        &self.engine
    }

    pub fn process(&self, request: DocumentRequest<'_>) -> Result<PipelineReport, IntakeError> {
        let rendered = self
            .renderer
            .render_page(request.document, request.page_number)?;
        let page = rendered.page;
        let classification =
            classify_page_size_with(page.width_pt, page.height_pt, self.tolerance_pt);
        let fm_key = normalize_issuer(request.issuer);

        let (region, region_source) = match request.crop {
            CropSource::Template => self.template_region(&fm_key, page, &classification)?,
            CropSource::Css { crop, displayed } => {
                let region = css_to_pdf_points(
                    crop,
                    displayed,
                    rendered.canvas_pixels,
                    page.points(),
                    page.bounds_offset,
                )?;
                (region, RegionSource::Crop)
            }
            CropSource::FullPage => (Region::full_page(page)?, RegionSource::FullPage),
        };

        let extraction = self
            .extractor
            .extract_candidate_number(request.document, &region)?;
        debug!(
            issuer = %fm_key,
            candidate = ?extraction.candidate_number,
            confidence = extraction.confidence_raw,
            "Candidate extracted"
        );

        let mut context = DecisionContext::new(request.issuer, hash_document(request.document));
        if let Some(signed_pdf_ref) = request.signed_pdf_ref {
            context = context.with_signed_pdf_ref(signed_pdf_ref);
        }
        let mut decision = self.engine.decide_and_merge(
            extraction.candidate_number.as_deref(),
            extraction.confidence_raw,
            &context,
        )?;

        if region_source == RegionSource::NonStandardFallback {
            decision.events.insert(
                0,
                IntakeEvent::NonStandardFallback {
                    width_pt: page.width_pt,
                    height_pt: page.height_pt,
                },
            );
        }

        Ok(PipelineReport {
            classification,
            region,
            region_source,
            extraction,
            decision,
        })
    }

    /// Turn a crop drawn on a preview into the issuer's stored template.
    ///
    /// The page must be a standard size and the crop must pass any configured
    /// rule for the issuer. Replaces an existing template for the same issuer.
    pub fn capture_template(
        &self,
        document: &[u8],
        issuer: &str,
        page_number: u32,
        crop: CssRect,
        displayed: PixelSize,
    ) -> Result<Template, IntakeError> {
        let rendered = self.renderer.render_page(document, page_number)?;
        let page = rendered.page;
        let region = css_to_pdf_points(
            crop,
            displayed,
            rendered.canvas_pixels,
            page.points(),
            page.bounds_offset,
        )?;

        let fm_key = normalize_issuer(issuer);
        let template = Template::capture(&fm_key, region, &self.template_rules, self.tolerance_pt)?;
        self.templates.save_template(&template)?;

        info!(
            issuer = %fm_key,
            page_size = %template.page_size,
            "Template saved"
        );
        Ok(template)
    }

    fn template_region(
        &self,
        fm_key: &str,
        page: PageGeometry,
        classification: &PageClassification,
    ) -> Result<(Region, RegionSource), IntakeError> {
        if !classification.is_standard {
            if !self.fallback_to_full_page {
                return Err(RegionError::NonStandardPage {
                    width_pt: page.width_pt,
                    height_pt: page.height_pt,
                }
                .into());
            }
            warn!(
                issuer = %fm_key,
                width_pt = page.width_pt,
                height_pt = page.height_pt,
                "Non-standard page, extracting over the full page"
            );
            return Ok((Region::full_page(page)?, RegionSource::NonStandardFallback));
        }

        let template = self
            .templates
            .load_template(fm_key)?
            .ok_or_else(|| IntakeError::TemplateNotFound(fm_key.to_string()))?;
        let region = template.region_for_page(page, self.tolerance_pt)?;
        Ok((region, RegionSource::Template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DecisionOutcome;
    use crate::ledger::{record_work_order, LedgerFields, MemoryLedger};
    use crate::ports::MemoryTemplateStore;
    use crate::review::MemoryReviewStore;
    use shared_types::{PixelRect, RenderedPage};
    use std::sync::Arc;

    struct FixedRenderer(RenderedPage);

    impl PageRenderer for FixedRenderer {
        fn render_page(
            &self,
            _document: &[u8],
            page_number: u32,
        ) -> Result<RenderedPage, IntakeError> {
            if page_number == 0 {
                return Err(IntakeError::Render("page numbers start at 1".to_string()));
            }
            Ok(self.0)
        }
    }

    struct FixedExtractor(Option<&'static str>, f64);

    impl CandidateExtractor for FixedExtractor {
        fn extract_candidate_number(
            &self,
            _document: &[u8],
            _region: &Region,
        ) -> Result<Extraction, IntakeError> {
            Ok(Extraction {
                candidate_number: self.0.map(str::to_string),
                confidence_raw: self.1,
            })
        }
    }

    fn letter_render() -> RenderedPage {
        RenderedPage {
            canvas_pixels: PixelSize::new(1224.0, 1584.0),
            page: PageGeometry::new(612.0, 792.0),
        }
    }

    fn pipeline(
        render: RenderedPage,
        extraction: (Option<&'static str>, f64),
    ) -> SignedDocumentPipeline<Arc<MemoryLedger>, MemoryReviewStore> {
        let ledger = Arc::new(MemoryLedger::new());
        record_work_order(&ledger, "acme.com", "WO-1", LedgerFields::default()).unwrap();
        SignedDocumentPipeline::new(
            DecisionEngine::new(ledger, MemoryReviewStore::new()),
            Box::new(FixedRenderer(render)),
            Box::new(FixedExtractor(extraction.0, extraction.1)),
            Box::new(MemoryTemplateStore::new()),
        )
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let pipeline = pipeline(letter_render(), (Some("WO-1"), 0.95));
        let err = pipeline
            .process(DocumentRequest::new(b"%PDF", "dispatch@acme.com"))
            .unwrap_err();
        assert!(matches!(err, IntakeError::TemplateNotFound(key) if key == "acme_com"));
    }

    #[test]
    fn test_css_crop_is_converted_and_merged() {
        let pipeline = pipeline(letter_render(), (Some("WO-1"), 0.95));
        let request = DocumentRequest::new(b"%PDF", "dispatch@acme.com").with_crop(CropSource::Css {
            crop: PixelRect::new(100.0, 100.0, 200.0, 50.0),
            displayed: PixelSize::new(612.0, 792.0),
        });

        let report = pipeline.process(request).unwrap();
        assert_eq!(report.region_source, RegionSource::Crop);
        assert!((report.region.x_pt() - 100.0).abs() < 1e-9);
        assert_eq!(report.classification.matched_size, Some("Letter"));
        assert_eq!(report.decision.outcome, DecisionOutcome::AutoMerged);
    }

    #[test]
    fn test_non_standard_page_falls_back_to_full_page() {
        let photo = RenderedPage {
            canvas_pixels: PixelSize::new(3024.0, 4032.0),
            page: PageGeometry::new(1512.0, 2016.0),
        };
        let pipeline = pipeline(photo, (None, 0.0));
        let report = pipeline
            .process(DocumentRequest::new(b"jpeg", "dispatch@acme.com"))
            .unwrap();

        assert_eq!(report.region_source, RegionSource::NonStandardFallback);
        assert_eq!(report.region.w_pt(), 1512.0);
        assert_eq!(report.decision.outcome, DecisionOutcome::PendingReview);
        assert!(matches!(
            report.decision.events[0],
            IntakeEvent::NonStandardFallback { .. }
        ));
    }

    #[test]
    fn test_non_standard_page_without_fallback_fails() {
        let photo = RenderedPage {
            canvas_pixels: PixelSize::new(3024.0, 4032.0),
            page: PageGeometry::new(1512.0, 2016.0),
        };
        let mut config = IntakeConfig::default();
        config.pipeline.fallback_to_full_page = false;
        let pipeline = pipeline(photo, (None, 0.0)).with_config(&config);

        let err = pipeline
            .process(DocumentRequest::new(b"jpeg", "dispatch@acme.com"))
            .unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Region(RegionError::NonStandardPage { .. })
        ));
    }

    #[test]
    fn test_render_failure_propagates() {
        let pipeline = pipeline(letter_render(), (Some("WO-1"), 0.95));
        let err = pipeline
            .process(DocumentRequest::new(b"%PDF", "acme.com").with_page_number(0))
            .unwrap_err();
        assert!(matches!(err, IntakeError::Render(_)));
    }
}
