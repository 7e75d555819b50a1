// ============================================================================
// SCAN VIEWMODEL - Bucle de escaneo QR sobre frames de vídeo
// ============================================================================
// El bucle es puro: recibe el instante del frame (requestAnimationFrame),
// una fuente de frames y un decodificador. La vista solo programa los ticks
// y reacciona al resultado.
// ============================================================================

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement};

use crate::config::{ScannerConfig, CONFIG};
use crate::utils::qr_ffi;

/// Polaridades probadas en orden sobre cada frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inversion {
    DontInvert,
    OnlyInvert,
    AttemptBoth,
}

impl Inversion {
    pub const SEQUENCE: [Inversion; 3] = [Inversion::DontInvert, Inversion::OnlyInvert, Inversion::AttemptBoth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Inversion::DontInvert => "dontInvert",
            Inversion::OnlyInvert => "onlyInvert",
            Inversion::AttemptBoth => "attemptBoth",
        }
    }
}

/// Región del vídeo que se analiza
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Frame completo en escritorio; en móvil solo el centro (`ratio` del lado)
pub fn crop_region(width: u32, height: u32, mobile: bool, ratio: f64) -> CropRegion {
    if !mobile || !(0.0..1.0).contains(&ratio) || ratio <= 0.0 {
        return CropRegion { x: 0, y: 0, width, height };
    }
    let crop_w = (width as f64 * ratio).floor() as u32;
    let crop_h = (height as f64 * ratio).floor() as u32;
    CropRegion {
        x: (width - crop_w) / 2,
        y: (height - crop_h) / 2,
        width: crop_w,
        height: crop_h,
    }
}

/// Píxeles RGBA de la región recortada
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub trait FrameSource {
    /// Dimensiones del vídeo si hay datos suficientes para leer
    fn dimensions(&self) -> Option<(u32, u32)>;
    fn capture(&mut self, region: CropRegion) -> Option<Frame>;
}

pub trait Decoder {
    fn decode(&mut self, frame: &Frame, inversion: Inversion) -> Option<String>;
}

/// Acepta contenido con el dominio o la organización, o suficientemente largo
pub fn validate_code(text: &str, config: &ScannerConfig) -> bool {
    let text = text.trim();
    text.contains(&config.accepted_domain)
        || text.contains(&config.accepted_organization)
        || text.chars().count() > config.min_code_length
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScanPhase {
    Idle,
    Scanning,
    /// Código rechazado: se reanuda en `until`
    Cooldown { until: f64 },
    /// Código aceptado, sesión terminada
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Fuera de intervalo, en pausa o detenido
    Skipped,
    NoCode,
    Detected(String),
    Rejected(String),
}

pub struct ScanLoop {
    phase: ScanPhase,
    last_scan_at: Option<f64>,
    mobile: bool,
    config: ScannerConfig,
}

impl ScanLoop {
    pub fn new(mobile: bool) -> Self {
        Self::with_config(mobile, CONFIG.scanner.clone())
    }

    pub fn with_config(mobile: bool, config: ScannerConfig) -> Self {
        Self { phase: ScanPhase::Idle, last_scan_at: None, mobile, config }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Debe seguir pidiendo frames
    pub fn is_active(&self) -> bool {
        matches!(self.phase, ScanPhase::Scanning | ScanPhase::Cooldown { .. })
    }

    pub fn start(&mut self) {
        self.phase = ScanPhase::Scanning;
        self.last_scan_at = None;
        log::info!("🔍 [SCANNER] Escaneo iniciado");
    }

    pub fn stop(&mut self) {
        if self.phase != ScanPhase::Done {
            self.phase = ScanPhase::Idle;
        }
        log::info!("⏹️ [SCANNER] Escaneo detenido");
    }

    pub fn tick<S: FrameSource, D: Decoder>(&mut self, now: f64, source: &mut S, decoder: &mut D) -> FrameOutcome {
        match self.phase {
            ScanPhase::Idle | ScanPhase::Done => return FrameOutcome::Skipped,
            ScanPhase::Cooldown { until } if now < until => return FrameOutcome::Skipped,
            ScanPhase::Cooldown { .. } => {
                log::info!("🔄 [SCANNER] Reanudando escaneo");
                self.phase = ScanPhase::Scanning;
            }
            ScanPhase::Scanning => {}
        }

        if let Some(last) = self.last_scan_at {
            if now - last < self.config.min_scan_interval_ms {
                return FrameOutcome::Skipped;
            }
        }
        self.last_scan_at = Some(now);

        let Some((width, height)) = source.dimensions() else {
            return FrameOutcome::NoCode;
        };
        let region = crop_region(width, height, self.mobile, self.config.mobile_crop_ratio);
        let Some(frame) = source.capture(region) else {
            return FrameOutcome::NoCode;
        };

        let Some(text) = Inversion::SEQUENCE
            .iter()
            .find_map(|inversion| decoder.decode(&frame, *inversion))
        else {
            return FrameOutcome::NoCode;
        };

        if validate_code(&text, &self.config) {
            log::info!("✅ [SCANNER] Código detectado ({} caracteres)", text.chars().count());
            self.phase = ScanPhase::Done;
            FrameOutcome::Detected(text)
        } else {
            log::warn!("⚠️ [SCANNER] Código rechazado: {}", text);
            self.phase = ScanPhase::Cooldown { until: now + self.config.restart_delay_ms };
            FrameOutcome::Rejected(text)
        }
    }
}

// ============================================================================
// IMPLEMENTACIONES DEL NAVEGADOR
// ============================================================================

/// Vídeo → canvas fuera de pantalla
pub struct CanvasFrameSource {
    video: HtmlVideoElement,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasFrameSource {
    pub fn new(video: HtmlVideoElement) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = crate::dom::create_element("canvas")?.dyn_into()?;
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { video, canvas, context })
    }
}

impl FrameSource for CanvasFrameSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        // HAVE_ENOUGH_DATA
        if self.video.ready_state() < 4 {
            return None;
        }
        let (w, h) = (self.video.video_width(), self.video.video_height());
        (w > 0 && h > 0).then_some((w, h))
    }

    fn capture(&mut self, region: CropRegion) -> Option<Frame> {
        self.canvas.set_width(region.width);
        self.canvas.set_height(region.height);
        let (w, h) = (region.width as f64, region.height as f64);
        self.context
            .draw_image_with_html_video_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                &self.video,
                region.x as f64,
                region.y as f64,
                w,
                h,
                0.0,
                0.0,
                w,
                h,
            )
            .ok()?;
        let image = self.context.get_image_data(0.0, 0.0, w, h).ok()?;
        let Clamped(data) = image.data();
        Some(Frame { data, width: region.width, height: region.height })
    }
}

/// Decodificador jsQR
pub struct JsQrDecoder;

impl Decoder for JsQrDecoder {
    fn decode(&mut self, frame: &Frame, inversion: Inversion) -> Option<String> {
        let pixels = js_sys::Uint8ClampedArray::from(frame.data.as_slice());
        let options = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&options, &"inversionAttempts".into(), &inversion.as_str().into());
        let _ = js_sys::Reflect::set(&options, &"minSize".into(), &JsValue::from_f64(100.0));
        let _ = js_sys::Reflect::set(&options, &"maxSize".into(), &JsValue::from_f64(1000.0));

        match qr_ffi::js_qr(&pixels, frame.width, frame.height, &options) {
            Ok(result) if !result.is_null() && !result.is_undefined() => {
                js_sys::Reflect::get(&result, &"data".into())
                    .ok()
                    .and_then(|d| d.as_string())
                    .filter(|d| !d.is_empty())
            }
            Ok(_) => None,
            Err(e) => {
                log::error!("❌ [SCANNER] jsQR falló: {:?}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        captures: usize,
    }

    impl FrameSource for FakeSource {
        fn dimensions(&self) -> Option<(u32, u32)> {
            Some((640, 480))
        }
        fn capture(&mut self, region: CropRegion) -> Option<Frame> {
            self.captures += 1;
            Some(Frame { data: vec![self.captures as u8], width: region.width, height: region.height })
        }
    }

    /// Decodifica `text` solo en el frame número `on_frame`
    struct FakeDecoder {
        on_frame: u8,
        text: String,
        calls: usize,
    }

    impl Decoder for FakeDecoder {
        fn decode(&mut self, frame: &Frame, _inversion: Inversion) -> Option<String> {
            self.calls += 1;
            (frame.data[0] == self.on_frame).then(|| self.text.clone())
        }
    }

    fn config() -> ScannerConfig {
        ScannerConfig::default()
    }

    #[test]
    fn test_fifth_frame_detection_is_emitted_once() {
        let mut scan = ScanLoop::with_config(false, config());
        let mut source = FakeSource { captures: 0 };
        let mut decoder = FakeDecoder { on_frame: 5, text: "https://xsc.szu.edu.cn/check?id=2024".into(), calls: 0 };
        scan.start();

        let mut detections = Vec::new();
        for i in 0..20 {
            if let FrameOutcome::Detected(text) = scan.tick(i as f64 * 100.0, &mut source, &mut decoder) {
                detections.push(text);
            }
        }

        assert_eq!(detections.len(), 1);
        assert_eq!(source.captures, 5);
        // 4 frames sin código × 3 polaridades + 1 acierto
        assert_eq!(decoder.calls, 13);
        assert_eq!(scan.phase(), ScanPhase::Done);
        assert!(!scan.is_active());
    }

    #[test]
    fn test_rejected_code_resumes_after_delay() {
        let mut scan = ScanLoop::with_config(false, config());
        let mut source = FakeSource { captures: 0 };
        let mut decoder = FakeDecoder { on_frame: 1, text: "abc".into(), calls: 0 };
        scan.start();

        assert_eq!(scan.tick(0.0, &mut source, &mut decoder), FrameOutcome::Rejected("abc".into()));
        assert_eq!(scan.phase(), ScanPhase::Cooldown { until: 2000.0 });
        assert!(scan.is_active());

        assert_eq!(scan.tick(1000.0, &mut source, &mut decoder), FrameOutcome::Skipped);
        assert_eq!(scan.tick(1999.0, &mut source, &mut decoder), FrameOutcome::Skipped);
        assert_eq!(source.captures, 1);

        assert_eq!(scan.tick(2000.0, &mut source, &mut decoder), FrameOutcome::NoCode);
        assert_eq!(scan.phase(), ScanPhase::Scanning);
        assert_eq!(source.captures, 2);
    }

    #[test]
    fn test_frames_are_throttled() {
        let mut scan = ScanLoop::with_config(false, config());
        let mut source = FakeSource { captures: 0 };
        let mut decoder = FakeDecoder { on_frame: 0, text: String::new(), calls: 0 };
        scan.start();

        // rAF a ~60 fps durante 1 s
        for i in 0..60 {
            scan.tick(i as f64 * 16.7, &mut source, &mut decoder);
        }
        assert!(source.captures <= 10);
        assert!(source.captures >= 9);
    }

    #[test]
    fn test_stopped_loop_does_not_decode() {
        let mut scan = ScanLoop::with_config(false, config());
        let mut source = FakeSource { captures: 0 };
        let mut decoder = FakeDecoder { on_frame: 1, text: "深圳大学新生".into(), calls: 0 };

        assert_eq!(scan.tick(0.0, &mut source, &mut decoder), FrameOutcome::Skipped);
        scan.start();
        scan.stop();
        assert_eq!(scan.tick(500.0, &mut source, &mut decoder), FrameOutcome::Skipped);
        assert_eq!(decoder.calls, 0);
    }

    #[test]
    fn test_mobile_crop_is_centered() {
        assert_eq!(crop_region(1280, 720, false, 0.8), CropRegion { x: 0, y: 0, width: 1280, height: 720 });
        assert_eq!(crop_region(1000, 500, true, 0.8), CropRegion { x: 100, y: 50, width: 800, height: 400 });
    }

    #[test]
    fn test_code_validation() {
        let cfg = config();
        assert!(validate_code("https://www.szu.edu.cn/x", &cfg));
        assert!(validate_code("深圳大学", &cfg));
        assert!(validate_code("20240001234", &cfg));
        assert!(!validate_code("0123456789", &cfg));
        assert!(!validate_code("hello", &cfg));
    }
}
