// ============================================================================
// MÓDULO DE INTERNACIONALIZACIÓN (中文 / English)
// ============================================================================

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Idioma de la interfaz
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }

    /// Valores desconocidos vuelven al idioma por defecto
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "en" => Language::English,
            _ => Language::Chinese,
        }
    }

    /// Elegir entre la variante china o inglesa de un texto
    pub fn pick<'a>(&self, zh: &'a str, en: &'a str) -> &'a str {
        match self {
            Language::Chinese => zh,
            Language::English => en,
        }
    }
}

/// Obtener diccionario de traducciones para un idioma
fn get_translations(lang: Language) -> HashMap<&'static str, &'static str> {
    let mut translations = HashMap::new();

    match lang {
        Language::Chinese => {
            // Común
            translations.insert("loading", "加载中...");
            translations.insert("success", "操作成功");
            translations.insert("error", "操作失败");
            translations.insert("confirm", "确认");
            translations.insert("cancel", "取消");
            translations.insert("submit", "提交");
            translations.insert("close", "关闭");
            translations.insert("refresh_page", "刷新页面");

            // Sign-in
            translations.insert("signin", "签到");
            translations.insert("signin_title", "课堂签到");
            translations.insert("signin_success", "签到成功！");
            translations.insert("signin_failed", "签到失败，请重试");
            translations.insert("signin_in_progress", "正在签到，请稍候");
            translations.insert("submitting", "正在提交...");
            translations.insert("photo_required", "请先拍照");
            translations.insert("course_required", "请输入课程名称");
            translations.insert("classroom_required", "请输入教室位置");
            translations.insert("tap_to_take_photo", "点击拍照");
            translations.insert("course_name", "课程名称");
            translations.insert("classroom", "教室");
            translations.insert("current_time", "当前时间");
            translations.insert("user_unavailable", "请在企业微信中访问");
            translations.insert("user_unavailable_hint", "获取用户信息失败");
            translations.insert("user_info_missing", "用户信息未获取，请在企业微信中访问或刷新页面");
            translations.insert("user_info_load_failed", "用户信息加载失败");

            // Ubicación
            translations.insert("location_getting", "正在获取位置信息...");
            translations.insert("location_pending", "等待位置信息...");
            translations.insert("location_failed", "获取位置信息失败");
            translations.insert("location_within_range", "位置有效");
            translations.insert("location_out_of_range", "超出签到范围");
            translations.insert("unknown_location", "未知位置");
            translations.insert("distance", "距离");
            translations.insert("meters", "米");
            translations.insert("kilometers", "公里");
            translations.insert("latitude", "纬度");
            translations.insert("longitude", "经度");
            translations.insert("building", "教学楼");
            translations.insert("coordinates", "坐标");

            // Errores
            translations.insert("bridge_not_ready", "企业微信未就绪，请在企业微信中打开");
            translations.insert("location_permission_denied", "定位权限被拒绝，请允许获取位置");
            translations.insert("location_timeout", "定位超时，请稍后重试");
            translations.insert("location_unavailable", "无法获取位置，请检查定位服务");
            translations.insert("network_error", "网络连接失败，请检查网络设置");
            translations.insert("server_error", "服务器错误，请稍后重试");
            translations.insert("auth_expired", "授权已过期，请刷新页面重新登录");
            translations.insert("permission_denied", "权限不足");
            translations.insert("invalid_format", "格式不正确");

            // Estadísticas / registros
            translations.insert("statistics_title", "考勤统计");
            translations.insert("records_title", "签到记录");
            translations.insert("attended_days", "出勤天数");
            translations.insert("missed_days", "缺勤天数");
            translations.insert("attendance_rate", "出勤率");
            translations.insert("status_present", "正常");
            translations.insert("status_late", "迟到");
            translations.insert("status_absent", "缺勤");
            translations.insert("status_all", "全部");
            translations.insert("range_week", "本周");
            translations.insert("range_month", "本月");
            translations.insert("range_semester", "本学期");
            translations.insert("search_placeholder", "搜索姓名、学号、课程或地点");
            translations.insert("no_records", "暂无记录");
            translations.insert("no_signin_record", "该日期没有签到记录");
            translations.insert("load_records_failed", "加载记录失败");
            translations.insert("load_attendance_failed", "加载出勤数据失败");
            translations.insert("export", "导出");
            translations.insert("exporting_data", "正在导出数据...");
            translations.insert("export_success", "导出成功");
            translations.insert("export_failed", "导出失败");
            translations.insert("prev_page", "上一页");
            translations.insert("next_page", "下一页");
            translations.insert("date", "日期");
            translations.insert("time", "时间");
            translations.insert("course", "课程");
            translations.insert("status", "状态");
            translations.insert("photo", "照片");
            translations.insert("no_photo", "无照片");
            translations.insert("location", "位置");

            // Feedback
            translations.insert("feedback_title", "意见反馈");
            translations.insert("feedback_rating", "评分");
            translations.insert("feedback_type", "反馈类型");
            translations.insert("feedback_type_bug", "问题反馈");
            translations.insert("feedback_type_suggestion", "功能建议");
            translations.insert("feedback_type_praise", "表扬鼓励");
            translations.insert("feedback_type_other", "其他");
            translations.insert("feedback_content", "反馈内容");
            translations.insert("feedback_contact", "联系方式（可选）");
            translations.insert("feedback_contact_placeholder", "邮箱或手机号，便于我们回复您");
            translations.insert("feedback_images", "上传图片（可选）");
            translations.insert("feedback_success", "感谢您的反馈！");
            translations.insert("feedback_failed", "提交失败，请稍后重试");
            translations.insert("rating_required", "请选择评分");
            translations.insert("type_required", "请选择反馈类型");
            translations.insert("content_required", "请填写反馈内容");
            translations.insert("contact_invalid", "请填写有效的邮箱或手机号");
            translations.insert("content_too_long", "反馈内容不能超过500个字符");
            translations.insert("too_many_images", "最多只能上传3张图片");
            translations.insert("image_not_image", "不是有效的图片文件");
            translations.insert("image_too_large", "文件过大，请选择小于5MB的图片");
            translations.insert("auth_expired_title", "授权已过期");

            // Registro de materiales
            translations.insert("material_title", "新生报到");
            translations.insert("scan_wework", "企业微信扫码");
            translations.insert("scan_camera", "摄像头扫码");
            translations.insert("manual_lookup", "手动查询");
            translations.insert("card_number", "学工号");
            translations.insert("card_number_required", "请输入学工号");
            translations.insert("card_number_too_short", "学工号长度不能少于6位");
            translations.insert("recent_records", "最近报到记录");
            translations.insert("no_recent_records", "暂无报到记录");
            translations.insert("scan_invalid_code", "请扫描深圳大学个人二维码");
            translations.insert("scan_failed", "二维码识别失败，请重试");
            translations.insert("scan_camera_hint", "请将二维码置于框内");
            translations.insert("lookup_failed", "查询失败，请检查学工号是否正确");
            translations.insert("already_received", "您已完成报到，无法重复报到");
            translations.insert("can_receive", "扫码成功！您可完成报到");
            translations.insert("receive_success", "新生报到成功！");
            translations.insert("receive_failed", "报到失败，请重试");
            translations.insert("confirm_receive", "确认报到");
            translations.insert("back_home", "返回首页");
            translations.insert("open_in_wework", "请在企业微信中打开此页面");
            translations.insert("handler_stats", "核验统计");
            translations.insert("total_handlers", "核验人数");
            translations.insert("total_checks", "核验总数");
            translations.insert("avg_checks", "人均核验");
            translations.insert("no_stats", "暂无统计数据");
            translations.insert("name", "姓名");
            translations.insert("student_id", "学号");
            translations.insert("department", "部门");

            // Cámara
            translations.insert("camera_denied", "摄像头权限被拒绝，请允许摄像头访问并刷新页面");
            translations.insert("camera_not_found", "未找到摄像头设备，请检查设备连接");
            translations.insert("camera_busy", "摄像头被其他应用占用，请关闭其他使用摄像头的应用");
            translations.insert("camera_overconstrained", "摄像头不支持请求的配置，尝试使用其他设置");
            translations.insert("camera_insecure", "安全错误：请确保在HTTPS环境下访问");
            translations.insert("camera_timeout", "摄像头启动超时，请重试或检查设备");
            translations.insert("camera_unsupported", "浏览器不支持摄像头访问，请使用现代浏览器");
            translations.insert("camera_error", "无法访问摄像头");
        }
        Language::English => {
            // Common
            translations.insert("loading", "Loading...");
            translations.insert("success", "Success");
            translations.insert("error", "Operation failed");
            translations.insert("confirm", "Confirm");
            translations.insert("cancel", "Cancel");
            translations.insert("submit", "Submit");
            translations.insert("close", "Close");
            translations.insert("refresh_page", "Refresh Page");

            // Sign-in
            translations.insert("signin", "Sign in");
            translations.insert("signin_title", "Class Sign-in");
            translations.insert("signin_success", "Sign in successful!");
            translations.insert("signin_failed", "Sign in failed, please try again");
            translations.insert("signin_in_progress", "Sign-in in progress, please wait");
            translations.insert("submitting", "Submitting...");
            translations.insert("photo_required", "Please take a photo first");
            translations.insert("course_required", "Please enter course name");
            translations.insert("classroom_required", "Please enter classroom location");
            translations.insert("tap_to_take_photo", "Tap to take photo");
            translations.insert("course_name", "Course name");
            translations.insert("classroom", "Classroom");
            translations.insert("current_time", "Current time");
            translations.insert("user_unavailable", "Please open in WeCom");
            translations.insert("user_unavailable_hint", "Failed to get user info");
            translations.insert("user_info_missing", "User info unavailable, please open in WeCom or refresh");
            translations.insert("user_info_load_failed", "Failed to load user info");

            // Location
            translations.insert("location_getting", "Getting location...");
            translations.insert("location_pending", "Waiting for location...");
            translations.insert("location_failed", "Failed to get location");
            translations.insert("location_within_range", "Location valid");
            translations.insert("location_out_of_range", "Out of sign-in range");
            translations.insert("unknown_location", "Unknown location");
            translations.insert("distance", "Distance");
            translations.insert("meters", "m");
            translations.insert("kilometers", "km");
            translations.insert("latitude", "Latitude");
            translations.insert("longitude", "Longitude");
            translations.insert("building", "Building");
            translations.insert("coordinates", "Coordinates");

            // Errors
            translations.insert("bridge_not_ready", "WeCom is not ready, please open in WeCom");
            translations.insert("location_permission_denied", "Location permission denied, please allow location access");
            translations.insert("location_timeout", "Location request timed out, please retry");
            translations.insert("location_unavailable", "Location unavailable, please check location services");
            translations.insert("network_error", "Network connection failed, please check network settings");
            translations.insert("server_error", "Server error, please try again later");
            translations.insert("auth_expired", "Authorization expired, please refresh and log in again");
            translations.insert("permission_denied", "Permission denied");
            translations.insert("invalid_format", "Invalid format");

            // Statistics / records
            translations.insert("statistics_title", "Attendance Statistics");
            translations.insert("records_title", "Sign-in Records");
            translations.insert("attended_days", "Attended days");
            translations.insert("missed_days", "Missed days");
            translations.insert("attendance_rate", "Attendance rate");
            translations.insert("status_present", "Present");
            translations.insert("status_late", "Late");
            translations.insert("status_absent", "Absent");
            translations.insert("status_all", "All");
            translations.insert("range_week", "This week");
            translations.insert("range_month", "This month");
            translations.insert("range_semester", "This semester");
            translations.insert("search_placeholder", "Search name, student ID, course or location");
            translations.insert("no_records", "No records");
            translations.insert("no_signin_record", "No sign-in record for this date");
            translations.insert("load_records_failed", "Failed to load records");
            translations.insert("load_attendance_failed", "Failed to load attendance data");
            translations.insert("export", "Export");
            translations.insert("exporting_data", "Exporting data...");
            translations.insert("export_success", "Export successful");
            translations.insert("export_failed", "Export failed");
            translations.insert("prev_page", "Previous");
            translations.insert("next_page", "Next");
            translations.insert("date", "Date");
            translations.insert("time", "Time");
            translations.insert("course", "Course");
            translations.insert("status", "Status");
            translations.insert("photo", "Photo");
            translations.insert("no_photo", "No photo");
            translations.insert("location", "Location");

            // Feedback
            translations.insert("feedback_title", "Feedback");
            translations.insert("feedback_rating", "Rating");
            translations.insert("feedback_type", "Feedback Type");
            translations.insert("feedback_type_bug", "Bug Report");
            translations.insert("feedback_type_suggestion", "Feature Request");
            translations.insert("feedback_type_praise", "Praise");
            translations.insert("feedback_type_other", "Other");
            translations.insert("feedback_content", "Feedback Content");
            translations.insert("feedback_contact", "Contact Info (Optional)");
            translations.insert("feedback_contact_placeholder", "Email or phone number for our reply");
            translations.insert("feedback_images", "Upload images (optional)");
            translations.insert("feedback_success", "Thank you for your feedback!");
            translations.insert("feedback_failed", "Submission failed, please try again later");
            translations.insert("rating_required", "Please select a rating");
            translations.insert("type_required", "Please select feedback type");
            translations.insert("content_required", "Please enter feedback content");
            translations.insert("contact_invalid", "Please enter a valid email or phone number");
            translations.insert("content_too_long", "Feedback content cannot exceed 500 characters");
            translations.insert("too_many_images", "Maximum 3 images allowed");
            translations.insert("image_not_image", "Not a valid image file");
            translations.insert("image_too_large", "File too large, please select an image under 5MB");
            translations.insert("auth_expired_title", "Authorization Expired");

            // Material check-in
            translations.insert("material_title", "New Student Check-in");
            translations.insert("scan_wework", "Scan with WeCom");
            translations.insert("scan_camera", "Scan with camera");
            translations.insert("manual_lookup", "Manual lookup");
            translations.insert("card_number", "Card number");
            translations.insert("card_number_required", "Please enter the card number");
            translations.insert("card_number_too_short", "Card number must have at least 6 characters");
            translations.insert("recent_records", "Recent check-ins");
            translations.insert("no_recent_records", "No check-in records");
            translations.insert("scan_invalid_code", "Please scan a Shenzhen University personal QR code");
            translations.insert("scan_failed", "QR code not recognised, please retry");
            translations.insert("scan_camera_hint", "Place the QR code inside the frame");
            translations.insert("lookup_failed", "Lookup failed, please check the card number");
            translations.insert("already_received", "Already checked in, cannot check in twice");
            translations.insert("can_receive", "Scan successful! You can complete the check-in");
            translations.insert("receive_success", "Check-in successful!");
            translations.insert("receive_failed", "Check-in failed, please retry");
            translations.insert("confirm_receive", "Confirm check-in");
            translations.insert("back_home", "Back to Home");
            translations.insert("open_in_wework", "Please open this page in WeCom");
            translations.insert("handler_stats", "Handler Statistics");
            translations.insert("total_handlers", "Handlers");
            translations.insert("total_checks", "Total checks");
            translations.insert("avg_checks", "Average per handler");
            translations.insert("no_stats", "No statistics yet");
            translations.insert("name", "Name");
            translations.insert("student_id", "Student ID");
            translations.insert("department", "Department");

            // Camera
            translations.insert("camera_denied", "Camera permission denied, please allow camera access and refresh");
            translations.insert("camera_not_found", "No camera found, please check the device");
            translations.insert("camera_busy", "Camera is used by another application");
            translations.insert("camera_overconstrained", "Camera does not support the requested settings");
            translations.insert("camera_insecure", "Security error: please use HTTPS");
            translations.insert("camera_timeout", "Camera start timed out, please retry");
            translations.insert("camera_unsupported", "Browser does not support camera access");
            translations.insert("camera_error", "Cannot access the camera");
        }
    }

    translations
}

/// Función de traducción
///
/// Devuelve la clave si no hay traducción
pub fn t(key: &str, lang: Language) -> String {
    let translations = get_translations(lang);

    if let Some(translation) = translations.get(key) {
        return translation.to_string();
    }

    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language_falls_back_to_chinese() {
        assert_eq!(Language::from_code("fr"), Language::Chinese);
        assert_eq!(Language::from_code("EN"), Language::English);
    }

    #[test]
    fn test_missing_key_returns_key() {
        assert_eq!(t("does_not_exist", Language::English), "does_not_exist");
        assert_eq!(t("signin_success", Language::Chinese), "签到成功！");
    }

    #[test]
    fn test_both_languages_share_keys() {
        let zh = get_translations(Language::Chinese);
        let en = get_translations(Language::English);
        let mut missing: Vec<_> = zh.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.sort();
        assert!(missing.is_empty(), "sin traducción inglesa: {:?}", missing);
    }
}
