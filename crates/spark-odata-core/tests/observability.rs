use spark_odata_core::{TracingInstallError, install_tracing};

/// 全局 Subscriber 只能设置一次，本文件仅保留这一个用例以独占测试进程。
#[test]
fn tracing_installs_only_once() {
    install_tracing().expect("首次安装应成功");
    tracing::info!(target: "spark_odata_core", "tracing installed");

    let err = install_tracing().expect_err("重复安装应失败");
    assert!(matches!(err, TracingInstallError::SubscriberAlreadySet));
    assert_eq!(err.code(), "odata.tracing.already_set");
}
