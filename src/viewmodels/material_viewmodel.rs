// ============================================================================
// MATERIAL VIEWMODEL - Registro de llegada de nuevos estudiantes
// ============================================================================
// Tres vías de entrada (escaneo WeCom, cámara, número manual) que terminan en
// la misma ficha del estudiante y en una única confirmación.
// ============================================================================

use std::cell::{Cell, RefCell};

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::models::material::{
    ConfirmReceiveRequest, CurrentUser, HandlerOverview, HandlerStat, ManualLookupRequest, RecentRecord,
    ScanRequest, StudentLookup,
};
use crate::services::api_client::ApiClient;

#[async_trait(?Send)]
pub trait MaterialGateway {
    async fn current_user(&self) -> AppResult<CurrentUser>;
    async fn recent_records(&self) -> AppResult<Vec<RecentRecord>>;
    async fn scan_qrcode(&self, request: &ScanRequest) -> AppResult<StudentLookup>;
    async fn manual_lookup(&self, request: &ManualLookupRequest) -> AppResult<StudentLookup>;
    async fn confirm_receive(&self, request: &ConfirmReceiveRequest) -> AppResult<Option<String>>;
    async fn handler_stats(&self) -> AppResult<Vec<HandlerStat>>;
}

#[async_trait(?Send)]
impl MaterialGateway for ApiClient {
    async fn current_user(&self) -> AppResult<CurrentUser> {
        ApiClient::current_user(self).await
    }
    async fn recent_records(&self) -> AppResult<Vec<RecentRecord>> {
        ApiClient::recent_records(self).await
    }
    async fn scan_qrcode(&self, request: &ScanRequest) -> AppResult<StudentLookup> {
        ApiClient::scan_qrcode(self, request).await
    }
    async fn manual_lookup(&self, request: &ManualLookupRequest) -> AppResult<StudentLookup> {
        ApiClient::manual_lookup(self, request).await
    }
    async fn confirm_receive(&self, request: &ConfirmReceiveRequest) -> AppResult<Option<String>> {
        ApiClient::confirm_receive(self, request).await
    }
    async fn handler_stats(&self) -> AppResult<Vec<HandlerStat>> {
        ApiClient::handler_stats(self).await
    }
}

/// Ficha devuelta por una consulta correcta
#[derive(Clone, Debug, PartialEq)]
pub enum LookupVerdict {
    CanReceive(StudentLookup),
    AlreadyReceived(StudentLookup),
}

impl LookupVerdict {
    pub fn student(&self) -> &StudentLookup {
        match self {
            LookupVerdict::CanReceive(s) | LookupVerdict::AlreadyReceived(s) => s,
        }
    }
}

pub struct MaterialViewModel<G> {
    gateway: G,
    device_id: String,
    current: RefCell<Option<StudentLookup>>,
    busy: Cell<bool>,
}

impl<G: MaterialGateway> MaterialViewModel<G> {
    pub fn new(gateway: G, device_id: String) -> Self {
        Self { gateway, device_id, current: RefCell::new(None), busy: Cell::new(false) }
    }

    pub async fn current_user(&self) -> Option<CurrentUser> {
        match self.gateway.current_user().await {
            Ok(user) => Some(user),
            Err(err) => {
                log::warn!("⚠️ [MATERIAL] Usuario actual no disponible: {}", err);
                None
            }
        }
    }

    pub async fn recent_records(&self) -> AppResult<Vec<RecentRecord>> {
        self.gateway.recent_records().await.map_err(|err| {
            log::error!("❌ [MATERIAL] Registros recientes: {}", err);
            err
        })
    }

    /// Código leído por cualquiera de los escáneres
    pub async fn lookup_scanned(&self, code: &str) -> AppResult<LookupVerdict> {
        log::info!("🔍 [MATERIAL] Consultando código escaneado");
        let request = ScanRequest { qr_code: code.trim().to_string(), device_id: self.device_id.clone() };
        let lookup = self.guarded(self.gateway.scan_qrcode(&request)).await?;
        self.accept(lookup)
    }

    pub async fn lookup_manual(&self, card_number: &str) -> AppResult<LookupVerdict> {
        let request = ManualLookupRequest::new(card_number)?;
        log::info!("🔍 [MATERIAL] Consulta manual: {}", request.card_number);
        let lookup = self.guarded(self.gateway.manual_lookup(&request)).await?;
        self.accept(lookup)
    }

    /// Confirma la ficha actual; solo posible si aún no había recibido
    pub async fn confirm(&self) -> AppResult<Option<String>> {
        let request = match self.current.borrow().as_ref() {
            Some(student) if !student.has_received => ConfirmReceiveRequest::from(student),
            Some(_) => return Err(AppError::Validation("already_received")),
            None => return Err(AppError::Validation("card_number_required")),
        };
        let message = self.guarded(self.gateway.confirm_receive(&request)).await?;
        log::info!("🎉 [MATERIAL] Registro confirmado: {}", request.card_number);
        if let Some(student) = self.current.borrow_mut().as_mut() {
            student.has_received = true;
        }
        Ok(message)
    }

    pub fn current(&self) -> Option<StudentLookup> {
        self.current.borrow().clone()
    }

    pub fn back_home(&self) {
        *self.current.borrow_mut() = None;
    }

    /// Ranking (mayor primero) y resumen de la página de estadísticas
    pub async fn handler_overview(&self) -> AppResult<(Vec<HandlerStat>, HandlerOverview)> {
        let mut stats = self.gateway.handler_stats().await?;
        stats.sort_by(|a, b| b.count.cmp(&a.count));
        let overview = HandlerOverview::from_stats(&stats);
        Ok((stats, overview))
    }

    async fn guarded<T>(&self, call: impl std::future::Future<Output = AppResult<T>>) -> AppResult<T> {
        if self.busy.replace(true) {
            return Err(AppError::Validation("submitting"));
        }
        let result = call.await;
        self.busy.set(false);
        result
    }

    fn accept(&self, lookup: StudentLookup) -> AppResult<LookupVerdict> {
        if !lookup.is_ok() {
            log::warn!("⚠️ [MATERIAL] Consulta rechazada ({}): {:?}", lookup.code, lookup.msg);
            *self.current.borrow_mut() = None;
            return Err(AppError::Server {
                status: u16::try_from(lookup.code).unwrap_or(400),
                message: lookup.msg.unwrap_or_default(),
            });
        }
        *self.current.borrow_mut() = Some(lookup.clone());
        Ok(if lookup.has_received {
            LookupVerdict::AlreadyReceived(lookup)
        } else {
            LookupVerdict::CanReceive(lookup)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[derive(Default)]
    struct FakeGateway {
        confirmed: RefCell<Vec<String>>,
        scans: RefCell<Vec<ScanRequest>>,
    }

    fn student(has_received: bool) -> StudentLookup {
        StudentLookup {
            code: 200,
            msg: None,
            name: "李四".into(),
            credential_no: "2024001234".into(),
            dept: "数学科学学院".into(),
            has_received,
        }
    }

    #[async_trait(?Send)]
    impl MaterialGateway for FakeGateway {
        async fn current_user(&self) -> AppResult<CurrentUser> {
            Err(AppError::AuthExpired)
        }
        async fn recent_records(&self) -> AppResult<Vec<RecentRecord>> {
            Ok(Vec::new())
        }
        async fn scan_qrcode(&self, request: &ScanRequest) -> AppResult<StudentLookup> {
            self.scans.borrow_mut().push(request.clone());
            if request.qr_code.contains("done") {
                Ok(student(true))
            } else if request.qr_code.contains("unknown") {
                Ok(StudentLookup { code: 404, msg: Some("未找到该学生".into()), ..student(false) })
            } else {
                Ok(student(false))
            }
        }
        async fn manual_lookup(&self, _request: &ManualLookupRequest) -> AppResult<StudentLookup> {
            Ok(student(false))
        }
        async fn confirm_receive(&self, request: &ConfirmReceiveRequest) -> AppResult<Option<String>> {
            self.confirmed.borrow_mut().push(request.card_number.clone());
            Ok(None)
        }
        async fn handler_stats(&self) -> AppResult<Vec<HandlerStat>> {
            Ok(vec![
                HandlerStat { handle_student_id: "a".into(), handle_name: "A".into(), count: 3 },
                HandlerStat { handle_student_id: "b".into(), handle_name: "B".into(), count: 8 },
            ])
        }
    }

    fn vm() -> MaterialViewModel<FakeGateway> {
        MaterialViewModel::new(FakeGateway::default(), "device_abc".into())
    }

    #[test]
    fn test_scan_then_confirm_once() {
        let vm = vm();
        let verdict = block_on(vm.lookup_scanned(" https://qr.szu.edu.cn/u/1 ")).unwrap();
        assert!(matches!(verdict, LookupVerdict::CanReceive(_)));
        assert_eq!(vm.gateway.scans.borrow()[0].device_id, "device_abc");
        assert_eq!(vm.gateway.scans.borrow()[0].qr_code, "https://qr.szu.edu.cn/u/1");

        block_on(vm.confirm()).unwrap();
        assert_eq!(*vm.gateway.confirmed.borrow(), vec!["2024001234".to_string()]);
        assert_eq!(block_on(vm.confirm()), Err(AppError::Validation("already_received")));
        assert_eq!(vm.gateway.confirmed.borrow().len(), 1);
    }

    #[test]
    fn test_already_received_cannot_confirm() {
        let vm = vm();
        let verdict = block_on(vm.lookup_scanned("https://qr.szu.edu.cn/done")).unwrap();
        assert!(matches!(verdict, LookupVerdict::AlreadyReceived(_)));
        assert_eq!(block_on(vm.confirm()), Err(AppError::Validation("already_received")));
    }

    #[test]
    fn test_rejected_lookup_carries_server_message() {
        let vm = vm();
        let err = block_on(vm.lookup_scanned("https://qr.szu.edu.cn/unknown")).unwrap_err();
        assert_eq!(err, AppError::Server { status: 404, message: "未找到该学生".into() });
        assert!(vm.current().is_none());
    }

    #[test]
    fn test_manual_lookup_validates_first() {
        let vm = vm();
        assert_eq!(block_on(vm.lookup_manual("  ")), Err(AppError::Validation("card_number_required")));
        assert_eq!(block_on(vm.lookup_manual("12345")), Err(AppError::Validation("card_number_too_short")));
        assert!(block_on(vm.lookup_manual("2024001234")).is_ok());
    }

    #[test]
    fn test_handler_ranking() {
        let (ranking, overview) = block_on(vm().handler_overview()).unwrap();
        assert_eq!(ranking[0].handle_name, "B");
        assert_eq!(overview.total_records, 11);
        assert_eq!(overview.average, 6);
    }

    #[test]
    fn test_missing_current_user_is_not_fatal() {
        assert!(block_on(vm().current_user()).is_none());
    }
}
